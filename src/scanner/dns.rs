//! DNS record collection and email-authentication record discovery.
//!
//! Queries fixed public resolvers rather than the system one, so results do
//! not depend on the auditing host's network configuration.

use crate::models::{DnsRecord, DnsRecordType};
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{debug, info};

/// Cloudflare and Google public resolvers
const PUBLIC_RESOLVERS: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
];

/// Common DKIM selector names tried when no DKIM TXT record was classified.
/// Not exhaustive; providers may use arbitrary selectors.
const DKIM_SELECTORS: &[&str] = &[
    "default",
    "google",
    "selector1",
    "selector2",
    "k1",
    "k2",
    "k3",
    "dkim",
    "mail",
    "email",
    "smtp",
    "mx",
    "s1",
    "s2",
    "s1024",
    "s2048",
    "sig1",
    "pm",
    "cm",
    "mandrill",
    "everlytickey1",
    "everlytickey2",
    "mailjet",
    "zendesk1",
    "zendesk2",
    "amazonses",
    "sendgrid",
    "smtpapi",
    "mailgun",
    "krs",
];

pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(query_timeout: Duration) -> Self {
        let servers = NameServerConfigGroup::from_ips_clear(&PUBLIC_RESOLVERS, 53, true);
        let config = ResolverConfig::from_parts(None, Vec::new(), servers);
        let mut opts = ResolverOpts::default();
        opts.timeout = query_timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// Collects every record class for the host, including the dedicated
    /// DMARC subdomain and, when needed, a DKIM selector sweep. Individual
    /// lookup failures contribute nothing; the run never faults on DNS.
    pub async fn resolve_records(&self, host: &str) -> Vec<DnsRecord> {
        let mut records = Vec::new();

        if let Ok(lookup) = self.resolver.ipv4_lookup(host).await {
            for a in lookup.iter() {
                records.push(DnsRecord::new(DnsRecordType::A, a.to_string()));
            }
        }
        if let Ok(lookup) = self.resolver.ipv6_lookup(host).await {
            for aaaa in lookup.iter() {
                records.push(DnsRecord::new(DnsRecordType::Aaaa, aaaa.to_string()));
            }
        }
        if let Ok(lookup) = self.resolver.mx_lookup(host).await {
            for mx in lookup.iter() {
                records.push(DnsRecord::new(
                    DnsRecordType::Mx,
                    format!("{} {}", mx.preference(), mx.exchange()),
                ));
            }
        }
        if let Ok(lookup) = self.resolver.ns_lookup(host).await {
            for ns in lookup.iter() {
                records.push(DnsRecord::new(DnsRecordType::Ns, ns.to_string()));
            }
        }
        if let Ok(lookup) = self.resolver.soa_lookup(host).await {
            for soa in lookup.iter() {
                records.push(DnsRecord::new(
                    DnsRecordType::Soa,
                    format!("{} {}", soa.mname(), soa.rname()),
                ));
            }
        }
        if let Ok(lookup) = self.resolver.lookup(host, RecordType::CNAME).await {
            for rdata in lookup.iter() {
                records.push(DnsRecord::new(DnsRecordType::Cname, rdata.to_string()));
            }
        }
        if let Ok(lookup) = self.resolver.txt_lookup(host).await {
            for txt in lookup.iter() {
                let value = txt
                    .iter()
                    .map(|data| String::from_utf8_lossy(data).to_string())
                    .collect::<String>();
                records.push(DnsRecord::new(classify_txt(&value), value));
            }
        }

        // DMARC lives on its own subdomain, not the apex TXT set
        if let Ok(lookup) = self.resolver.txt_lookup(format!("_dmarc.{host}")).await {
            for txt in lookup.iter() {
                let value = txt
                    .iter()
                    .map(|data| String::from_utf8_lossy(data).to_string())
                    .collect::<String>();
                if value.starts_with("v=DMARC1") {
                    records.push(DnsRecord::new(DnsRecordType::Dmarc, value));
                }
            }
        }

        if !records
            .iter()
            .any(|r| r.record_type == DnsRecordType::Dkim)
        {
            if let Some(record) = self.sweep_dkim_selectors(host).await {
                records.push(record);
            }
        }

        info!("dns resolution for {host}: {} records", records.len());
        records
    }

    /// Tries the common-selector list, TXT then CNAME, stopping at the first
    /// hit. Exhaustion means "none detected", not "none configured".
    async fn sweep_dkim_selectors(&self, host: &str) -> Option<DnsRecord> {
        for selector in DKIM_SELECTORS {
            let name = format!("{selector}._domainkey.{host}");

            if let Ok(lookup) = self.resolver.txt_lookup(name.clone()).await {
                for txt in lookup.iter() {
                    let value = txt
                        .iter()
                        .map(|data| String::from_utf8_lossy(data).to_string())
                        .collect::<String>();
                    if value.contains("v=DKIM1") || value.contains("k=rsa") {
                        debug!("dkim selector hit: {name}");
                        return Some(DnsRecord::new(
                            DnsRecordType::Dkim,
                            format!("{selector}: {value}"),
                        ));
                    }
                }
            }
            // Hosted mail providers often publish the key behind a CNAME
            if let Ok(lookup) = self.resolver.lookup(name.clone(), RecordType::CNAME).await {
                if let Some(rdata) = lookup.iter().next() {
                    debug!("dkim selector cname hit: {name}");
                    return Some(DnsRecord::new(
                        DnsRecordType::Dkim,
                        format!("{selector}: CNAME {rdata}"),
                    ));
                }
            }
        }
        debug!("dkim selector sweep exhausted for {host}");
        None
    }
}

/// TXT record classification by well-known value prefix
pub fn classify_txt(value: &str) -> DnsRecordType {
    if value.starts_with("v=spf1") {
        DnsRecordType::Spf
    } else if value.starts_with("v=DMARC1") {
        DnsRecordType::Dmarc
    } else if value.starts_with("v=DKIM1") {
        DnsRecordType::Dkim
    } else {
        DnsRecordType::Txt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_prefixes_classify_into_email_auth_types() {
        assert_eq!(classify_txt("v=spf1 include:_spf.example.com ~all"), DnsRecordType::Spf);
        assert_eq!(classify_txt("v=DMARC1; p=reject"), DnsRecordType::Dmarc);
        assert_eq!(classify_txt("v=DKIM1; k=rsa; p=MIGf"), DnsRecordType::Dkim);
        assert_eq!(classify_txt("google-site-verification=abc"), DnsRecordType::Txt);
    }

    #[test]
    fn selector_list_covers_major_providers() {
        assert!(DKIM_SELECTORS.len() >= 30);
        assert!(DKIM_SELECTORS.contains(&"google"));
        assert!(DKIM_SELECTORS.contains(&"selector1"));
        assert!(DKIM_SELECTORS.contains(&"amazonses"));
    }
}
