//! Audit scanner components: network collectors, the vulnerability probe
//! suite, the source-leak detector, and the compliance checker.

pub mod compliance;
pub mod dns;
pub mod headers;
pub mod leaks;
pub mod ports;
pub mod soft404;
pub mod tls;
pub mod vulns;
