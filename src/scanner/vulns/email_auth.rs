//! Email-authentication posture derived from collected DNS records

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{DnsRecord, DnsRecordType, Severity, VulnerabilityFinding};
use async_trait::async_trait;

pub struct EmailAuthProbe;

#[async_trait]
impl Probe for EmailAuthProbe {
    fn id(&self) -> &str {
        "email-auth"
    }

    async fn run(
        &self,
        _client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        Ok(evaluate(self.id(), &ctx.target.host, &ctx.dns))
    }
}

fn evaluate(probe_id: &str, host: &str, records: &[DnsRecord]) -> Vec<VulnerabilityFinding> {
    let mut findings = Vec::new();

    let spf = records
        .iter()
        .find(|r| r.record_type == DnsRecordType::Spf);
    match spf {
        None => findings.push(
            VulnerabilityFinding::new(
                format!("{probe_id}-spf-missing"),
                "No SPF Record",
                Severity::Medium,
                "Email Authentication",
                "The domain publishes no SPF record; any host can send mail \
                 claiming this domain."
                    .to_string(),
                host,
            )
            .with_remediation("Publish a TXT record starting with 'v=spf1' listing permitted senders.")
            .with_cwe("CWE-290"),
        ),
        Some(record) if record.value.contains("+all") => findings.push(
            VulnerabilityFinding::new(
                format!("{probe_id}-spf-permissive"),
                "Permissive SPF Policy (+all)",
                Severity::High,
                "Email Authentication",
                format!("The SPF record authorizes every sender: {}", record.value),
                host,
            )
            .with_remediation("Replace '+all' with '~all' or '-all'.")
            .with_cwe("CWE-290"),
        ),
        Some(_) => {}
    }

    let dmarc = records
        .iter()
        .find(|r| r.record_type == DnsRecordType::Dmarc);
    match dmarc {
        None => findings.push(
            VulnerabilityFinding::new(
                format!("{probe_id}-dmarc-missing"),
                "No DMARC Record",
                Severity::Medium,
                "Email Authentication",
                "No DMARC policy is published; receivers have no instruction for \
                 handling spoofed mail."
                    .to_string(),
                host,
            )
            .with_remediation("Publish a _dmarc TXT record with at least 'p=quarantine'.")
            .with_cwe("CWE-290"),
        ),
        Some(record) => {
            let value = record.value.replace(' ', "");
            if value.contains("p=none") {
                findings.push(
                    VulnerabilityFinding::new(
                        format!("{probe_id}-dmarc-none"),
                        "DMARC Policy Set to 'none'",
                        Severity::Low,
                        "Email Authentication",
                        "The DMARC policy is monitoring-only; spoofed mail is still \
                         delivered."
                            .to_string(),
                        host,
                    )
                    .with_remediation("Move the policy to 'p=quarantine' or 'p=reject'."),
                );
            }
            if !value.contains("rua=") {
                findings.push(
                    VulnerabilityFinding::new(
                        format!("{probe_id}-dmarc-no-rua"),
                        "DMARC Without Aggregate Reporting",
                        Severity::Info,
                        "Email Authentication",
                        "The DMARC record has no rua= address; authentication failures \
                         go unreported."
                            .to_string(),
                        host,
                    )
                    .with_remediation("Add a 'rua=mailto:' reporting address to the DMARC record."),
                );
            }
        }
    }

    if !records
        .iter()
        .any(|r| r.record_type == DnsRecordType::Dkim)
    {
        findings.push(
            VulnerabilityFinding::new(
                format!("{probe_id}-dkim-none-detected"),
                "No DKIM Record Detected (Inconclusive)",
                Severity::Low,
                "Email Authentication",
                "No DKIM key was found under the common selector names. This is \
                 inconclusive: the domain may sign with a non-standard selector."
                    .to_string(),
                host,
            )
            .with_remediation("Verify DKIM signing is configured and keys are published."),
        );
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: DnsRecordType, value: &str) -> DnsRecord {
        DnsRecord::new(record_type, value)
    }

    #[test]
    fn absence_of_all_three_is_explicitly_reported() {
        let findings = evaluate("email-auth", "example.com", &[]);
        let ids: Vec<&str> = findings.iter().map(|f| f.id.as_str()).collect();
        assert!(ids.contains(&"email-auth-spf-missing"));
        assert!(ids.contains(&"email-auth-dmarc-missing"));
        assert!(ids.contains(&"email-auth-dkim-none-detected"));
    }

    #[test]
    fn permissive_spf_is_high() {
        let records = vec![record(DnsRecordType::Spf, "v=spf1 +all")];
        let findings = evaluate("email-auth", "example.com", &records);
        let spf = findings
            .iter()
            .find(|f| f.id == "email-auth-spf-permissive")
            .unwrap();
        assert_eq!(spf.severity, Severity::High);
    }

    #[test]
    fn monitoring_only_dmarc_is_flagged() {
        let records = vec![
            record(DnsRecordType::Spf, "v=spf1 -all"),
            record(DnsRecordType::Dmarc, "v=DMARC1; p=none; rua=mailto:d@example.com"),
            record(DnsRecordType::Dkim, "default: v=DKIM1; k=rsa; p=MIGf"),
        ];
        let findings = evaluate("email-auth", "example.com", &records);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "email-auth-dmarc-none");
    }

    #[test]
    fn hardened_records_produce_no_findings() {
        let records = vec![
            record(DnsRecordType::Spf, "v=spf1 include:_spf.example.com -all"),
            record(
                DnsRecordType::Dmarc,
                "v=DMARC1; p=reject; rua=mailto:dmarc@example.com",
            ),
            record(DnsRecordType::Dkim, "default: v=DKIM1; k=rsa; p=MIGf"),
        ];
        assert!(evaluate("email-auth", "example.com", &records).is_empty());
    }
}
