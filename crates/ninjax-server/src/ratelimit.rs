//! Per-route request budgets, keyed by client IP.
//!
//! Each route class holds an independent GCRA limiter (token-bucket
//! semantics: burst capacity equals the per-minute quota, refill is
//! continuous — not a fixed calendar window). The check happens before any
//! extractor work is dispatched, so a rejected request never consumes a
//! worker-pool slot.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use ninjax_core::config::RateConfig;
use ninjax_core::error::GatewayError;
use nonzero_ext::nonzero;
use std::net::IpAddr;
use std::num::NonZeroU32;

type IpLimiter = DefaultKeyedRateLimiter<IpAddr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Analyze,
    Download,
    Cookies,
    Files,
}

pub struct RouteBudgets {
    analyze: IpLimiter,
    download: IpLimiter,
    cookies: IpLimiter,
    files: IpLimiter,
}

fn per_minute(n: u32) -> IpLimiter {
    let quota = NonZeroU32::new(n).unwrap_or(nonzero!(1u32));
    RateLimiter::keyed(Quota::per_minute(quota))
}

impl RouteBudgets {
    pub fn new(cfg: &RateConfig) -> Self {
        Self {
            analyze: per_minute(cfg.analyze_per_minute),
            download: per_minute(cfg.download_per_minute),
            cookies: per_minute(cfg.cookies_per_minute),
            files: per_minute(cfg.files_per_minute),
        }
    }

    /// Terminal decision for this request: either it fits the budget or it
    /// is rejected now. No retry-after dance.
    pub fn check(&self, class: RouteClass, ip: IpAddr) -> Result<(), GatewayError> {
        let limiter = match class {
            RouteClass::Analyze => &self.analyze,
            RouteClass::Download => &self.download,
            RouteClass::Cookies => &self.cookies,
            RouteClass::Files => &self.files,
        };
        limiter.check_key(&ip).map_err(|_| {
            tracing::debug!(?class, %ip, "request over budget");
            GatewayError::RateLimited
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn burst_up_to_quota_then_reject() {
        let budgets = RouteBudgets::new(&RateConfig {
            analyze_per_minute: 5,
            download_per_minute: 5,
            cookies_per_minute: 5,
            files_per_minute: 5,
        });
        for i in 0..5 {
            assert!(
                budgets.check(RouteClass::Download, ip(1)).is_ok(),
                "request {i} should fit the budget"
            );
        }
        assert!(matches!(
            budgets.check(RouteClass::Download, ip(1)).unwrap_err(),
            GatewayError::RateLimited
        ));
    }

    #[test]
    fn budgets_are_independent_per_route_and_ip() {
        let budgets = RouteBudgets::new(&RateConfig {
            analyze_per_minute: 1,
            download_per_minute: 1,
            cookies_per_minute: 1,
            files_per_minute: 1,
        });
        assert!(budgets.check(RouteClass::Analyze, ip(1)).is_ok());
        assert!(budgets.check(RouteClass::Analyze, ip(1)).is_err());
        // Exhausting analyze leaves download untouched.
        assert!(budgets.check(RouteClass::Download, ip(1)).is_ok());
        // Another client has its own bucket.
        assert!(budgets.check(RouteClass::Analyze, ip(2)).is_ok());
    }

    #[test]
    fn zero_config_clamps_to_one() {
        let budgets = RouteBudgets::new(&RateConfig {
            analyze_per_minute: 0,
            download_per_minute: 0,
            cookies_per_minute: 0,
            files_per_minute: 0,
        });
        assert!(budgets.check(RouteClass::Cookies, ip(1)).is_ok());
        assert!(budgets.check(RouteClass::Cookies, ip(1)).is_err());
    }
}
