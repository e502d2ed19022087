use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;
use url::{Host, Url};

/// Deadline for one DNS lookup inside the validator. A lookup that takes
/// longer is reported as a resolution failure.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reasons a webhook destination is refused before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsafeUrl {
    #[error("unsupported URL scheme '{0}': only http and https are allowed")]
    Scheme(String),
    #[error("webhook URL has no hostname")]
    MissingHost,
    #[error("blocked loopback or link-local destination '{0}'")]
    Loopback(String),
    #[error("blocked private-network destination '{0}'")]
    PrivateNetwork(String),
    #[error("hostname '{host}' resolves to internal address {addr}")]
    ResolvesInternally { host: String, addr: IpAddr },
}

/// DNS lookup seam. The production resolver goes through the system stack;
/// tests substitute fixed answers so rebinding scenarios are reproducible.
pub trait HostResolver: Send + Sync {
    fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system. The lookup runs on its own
/// thread so the caller blocks for at most [`RESOLVE_TIMEOUT`]; on timeout
/// the thread is left to finish on its own and its answer is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        let (tx, rx) = mpsc::channel();
        let lookup_host = host.to_string();
        thread::spawn(move || {
            let result = (lookup_host.as_str(), 0)
                .to_socket_addrs()
                .map(|addrs| addrs.map(|addr| addr.ip()).collect::<Vec<_>>());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(RESOLVE_TIMEOUT) {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("DNS lookup for '{host}' timed out"),
            )),
        }
    }
}

/// Decides whether an outbound webhook URL is safe to contact.
///
/// Verdicts are never cached: configuration and DNS can change between calls,
/// so callers must re-validate on every dispatch.
pub struct WebhookUrlPolicy {
    allow_local: bool,
    resolver: Box<dyn HostResolver>,
}

impl std::fmt::Debug for WebhookUrlPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookUrlPolicy")
            .field("allow_local", &self.allow_local)
            .finish_non_exhaustive()
    }
}

impl WebhookUrlPolicy {
    pub fn new(allow_local: bool) -> Self {
        Self::with_resolver(allow_local, Box::new(SystemResolver))
    }

    pub fn with_resolver(allow_local: bool, resolver: Box<dyn HostResolver>) -> Self {
        Self {
            allow_local,
            resolver,
        }
    }

    /// Classifies `url` as safe or unsafe for an outbound POST.
    ///
    /// Scheme and hostname-presence checks always apply. With the local
    /// bypass enabled everything else is waved through with a warning; the
    /// flag exists for development against a webhook on the same machine.
    pub fn validate(&self, url: &Url) -> Result<(), UnsafeUrl> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(UnsafeUrl::Scheme(scheme.to_string()));
        }

        let host = url.host().ok_or(UnsafeUrl::MissingHost)?;

        if self.allow_local {
            warn!(%url, "local webhook bypass enabled; skipping destination checks");
            return Ok(());
        }

        match host {
            Host::Ipv4(addr) => classify_v4(addr, &addr.to_string()),
            Host::Ipv6(addr) => classify_v6(addr, &addr.to_string()),
            Host::Domain(name) => {
                let lowered = name.to_ascii_lowercase();
                if lowered.starts_with("localhost")
                    || lowered.starts_with("169.254.")
                    || lowered.starts_with("fe80:")
                {
                    return Err(UnsafeUrl::Loopback(lowered));
                }
                self.check_resolved(&lowered)
            }
        }
    }

    /// DNS-rebinding defence: a public-looking name must not resolve to an
    /// internal address. Resolution failure is not a security signal; the
    /// name is treated as external and the dispatch will fail on its own.
    fn check_resolved(&self, host: &str) -> Result<(), UnsafeUrl> {
        let addrs = match self.resolver.resolve(host) {
            Ok(addrs) => addrs,
            Err(err) => {
                warn!(%host, error = %err, "webhook hostname did not resolve; treating as external");
                return Ok(());
            }
        };

        for addr in addrs {
            let verdict = match addr {
                IpAddr::V4(v4) => classify_v4(v4, host),
                IpAddr::V6(v6) => classify_v6(v6, host),
            };
            if verdict.is_err() {
                return Err(UnsafeUrl::ResolvesInternally {
                    host: host.to_string(),
                    addr,
                });
            }
        }

        Ok(())
    }
}

fn classify_v4(addr: Ipv4Addr, shown: &str) -> Result<(), UnsafeUrl> {
    if addr.is_loopback() || addr.is_unspecified() || addr.is_link_local() {
        return Err(UnsafeUrl::Loopback(shown.to_string()));
    }
    if addr.is_private() {
        return Err(UnsafeUrl::PrivateNetwork(shown.to_string()));
    }
    Ok(())
}

fn classify_v6(addr: Ipv6Addr, shown: &str) -> Result<(), UnsafeUrl> {
    if addr.is_loopback() || addr.is_unspecified() {
        return Err(UnsafeUrl::Loopback(shown.to_string()));
    }
    // fe80::/10 link-local range.
    if addr.segments()[0] & 0xffc0 == 0xfe80 {
        return Err(UnsafeUrl::Loopback(shown.to_string()));
    }
    if let Some(mapped) = addr.to_ipv4_mapped() {
        return classify_v4(mapped, shown);
    }
    Ok(())
}
