//! Markdown and JSON rendering of analyses and batch runs.
//!
//! Rendering only. Writing files is the caller's job.

use std::fmt::{self, Write};

use sitesignal_shared::{
    BatchResult, Result, ScoredSummary, SignalCategory, SiteAnalysis, SiteSignalError,
};

/// Pretty-printed JSON for any report payload.
pub fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SiteSignalError::Report(format!("JSON serialization failed: {e}")))
}

/// Markdown report for one site.
pub fn site_markdown(analysis: &SiteAnalysis) -> Result<String> {
    let mut out = String::new();
    write_site(&mut out, analysis, 1).map_err(render_error)?;
    Ok(out)
}

/// Markdown report for a batch run: overview, aggregate, then each site.
pub fn batch_markdown(batch: &BatchResult) -> Result<String> {
    let mut out = String::new();
    write_batch(&mut out, batch).map_err(render_error)?;
    Ok(out)
}

fn render_error(e: fmt::Error) -> SiteSignalError {
    SiteSignalError::Report(format!("markdown rendering failed: {e}"))
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

fn write_site(out: &mut String, a: &SiteAnalysis, level: usize) -> fmt::Result {
    let h = "#".repeat(level);

    writeln!(out, "{h} {}", a.company_name)?;
    writeln!(out)?;
    writeln!(out, "- **URL:** {}", a.main_url)?;
    writeln!(out, "- **Analyzed:** {}", a.fetched_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out)?;

    writeln!(out, "{h}# Legal links")?;
    writeln!(out)?;
    let privacy_note = if a.links.privacy_policy_guessed {
        " (guessed)"
    } else {
        ""
    };
    write_link(out, "Privacy policy", a.links.privacy_policy.as_ref(), privacy_note)?;
    write_link(out, "Trust center", a.links.trust_center.as_ref(), "")?;
    write_link(out, "Terms of service", a.links.terms_of_service.as_ref(), "")?;
    writeln!(out)?;

    writeln!(out, "{h}# Summary")?;
    writeln!(out)?;
    writeln!(out, "{}", a.privacy_summary)?;
    writeln!(out)?;
    writeln!(out, "{}", a.trust_summary)?;
    writeln!(out)?;

    writeln!(out, "{h}# Signals")?;
    writeln!(out)?;
    writeln!(out, "| Category | Count |")?;
    writeln!(out, "|---|---|")?;
    for category in SignalCategory::ALL {
        writeln!(out, "| {} | {} |", category.label(), a.signals.count(category))?;
    }
    writeln!(out)?;
    for bucket in a.signals.0.values().filter(|b| !b.is_empty()) {
        writeln!(out, "**{}**", bucket.category.label())?;
        writeln!(out)?;
        for evidence in &bucket.evidence {
            writeln!(out, "- {evidence}")?;
        }
        writeln!(out)?;
    }

    if !a.contact.is_empty() {
        writeln!(out, "{h}# Contact")?;
        writeln!(out)?;
        write_list(out, "Emails", &a.contact.emails)?;
        write_list(out, "Phones", &a.contact.phones)?;
        write_list(out, "Addresses", &a.contact.addresses)?;
        writeln!(out)?;
    }

    if let Some(description) = &a.about.description {
        writeln!(out, "{h}# About")?;
        writeln!(out)?;
        writeln!(out, "> {description}")?;
        writeln!(out)?;
    }

    if let Some(ai) = &a.ai_summary {
        write_ai(out, ai, &h)?;
    }

    Ok(())
}

fn write_link(out: &mut String, label: &str, url: Option<&url::Url>, note: &str) -> fmt::Result {
    match url {
        Some(url) => writeln!(out, "- **{label}:** <{url}>{note}"),
        None => writeln!(out, "- **{label}:** not found"),
    }
}

fn write_list(out: &mut String, label: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "- **{label}:** {}", items.join(", "))
}

fn write_ai(out: &mut String, ai: &ScoredSummary, h: &str) -> fmt::Result {
    writeln!(out, "{h}# AI assessment ({})", ai.source.as_str().replace('_', " "))?;
    writeln!(out)?;
    writeln!(out, "{}", ai.summary)?;
    writeln!(out)?;
    writeln!(
        out,
        "Scores: privacy {}/10, security {}/10, compliance {}/10",
        ai.privacy_score, ai.security_score, ai.compliance_score
    )?;
    writeln!(out)?;

    for (title, items) in [
        ("Key findings", &ai.key_findings),
        ("Risks", &ai.risks),
        ("Recommendations", &ai.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        writeln!(out, "**{title}**")?;
        writeln!(out)?;
        for item in items {
            writeln!(out, "- {item}")?;
        }
        writeln!(out)?;
    }

    if !ai.data_usage_summary.is_empty() {
        writeln!(out, "**Data usage:** {}", ai.data_usage_summary)?;
        writeln!(out)?;
    }
    if !ai.user_rights_summary.is_empty() {
        writeln!(out, "**User rights:** {}", ai.user_rights_summary)?;
        writeln!(out)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

fn write_batch(out: &mut String, b: &BatchResult) -> fmt::Result {
    writeln!(out, "# Batch report")?;
    writeln!(out)?;
    writeln!(out, "- **Run:** {}", b.run_id)?;
    writeln!(
        out,
        "- **Started:** {}",
        b.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "- **Duration:** {}s",
        (b.finished_at - b.started_at).num_seconds()
    )?;
    writeln!(
        out,
        "- **Sites:** {} total, {} succeeded, {} failed",
        b.total, b.successful, b.failed
    )?;
    writeln!(out)?;

    writeln!(out, "## Aggregate")?;
    writeln!(out)?;
    let score = |s: Option<f64>| s.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));
    writeln!(out, "- **Average privacy score:** {}", score(b.aggregate.avg_privacy_score))?;
    writeln!(out, "- **Average security score:** {}", score(b.aggregate.avg_security_score))?;
    writeln!(
        out,
        "- **Average compliance score:** {}",
        score(b.aggregate.avg_compliance_score)
    )?;
    if !b.aggregate.top_company_names.is_empty() {
        writeln!(
            out,
            "- **Companies:** {}",
            b.aggregate.top_company_names.join(", ")
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Results")?;
    writeln!(out)?;
    writeln!(out, "| # | URL | Status |")?;
    writeln!(out, "|---|---|---|")?;
    for (i, entry) in b.results.iter().enumerate() {
        let status = match (&entry.analysis, &entry.error) {
            (Some(a), _) => format!("ok: {}", a.company_name),
            (None, Some(err)) => format!("failed: {}", err.replace('|', "\\|")),
            (None, None) => "failed".to_string(),
        };
        writeln!(out, "| {} | {} | {} |", i + 1, entry.url, status)?;
    }
    writeln!(out)?;

    for analysis in b.results.iter().filter_map(|e| e.analysis.as_ref()) {
        write_site(out, analysis, 2)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sitesignal_shared::{
        AboutInfo, BatchAggregate, BatchEntry, ContactInfo, ContentType, LinkSet, RunId, Signals,
    };
    use url::Url;

    fn analysis(name: &str) -> SiteAnalysis {
        let mut signals = Signals::empty();
        signals
            .0
            .get_mut(&SignalCategory::Compliance)
            .unwrap()
            .evidence
            .push("Compliance mentioned with 'gdpr'".into());

        SiteAnalysis {
            company_name: name.into(),
            main_url: Url::parse("https://acme.example/").unwrap(),
            links: LinkSet {
                privacy_policy: Some(Url::parse("https://acme.example/privacy").unwrap()),
                privacy_policy_guessed: true,
                ..LinkSet::default()
            },
            contact: ContactInfo {
                emails: vec!["hello@acme.example".into()],
                ..ContactInfo::default()
            },
            about: AboutInfo::default(),
            signals,
            privacy_summary: "Privacy policy found: 0 data collection, 0 data sharing, \
                              0 user rights, 0 security, 1 compliance signals."
                .into(),
            trust_summary: "Trust center not found".into(),
            ai_summary: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn site_report_sections() {
        let md = site_markdown(&analysis("Acme")).unwrap();

        assert!(md.starts_with("# Acme\n"));
        assert!(md.contains("- **Privacy policy:** <https://acme.example/privacy> (guessed)"));
        assert!(md.contains("- **Trust center:** not found"));
        assert!(md.contains("| Compliance | 1 |"));
        assert!(md.contains("- Compliance mentioned with 'gdpr'"));
        assert!(md.contains("- **Emails:** hello@acme.example"));
        assert!(!md.contains("AI assessment"));
    }

    #[test]
    fn ai_section_rendered_when_present() {
        let mut a = analysis("Acme");
        a.ai_summary = Some(ScoredSummary {
            summary: "Solid policy.".into(),
            key_findings: vec!["No sales of data".into()],
            privacy_score: 8,
            security_score: 7,
            compliance_score: 9,
            recommendations: vec![],
            risks: vec![],
            data_usage_summary: String::new(),
            user_rights_summary: "Deletion on request.".into(),
            source: ContentType::PrivacyPolicy,
        });

        let md = site_markdown(&a).unwrap();
        assert!(md.contains("## AI assessment (privacy policy)"));
        assert!(md.contains("Scores: privacy 8/10, security 7/10, compliance 9/10"));
        assert!(md.contains("- No sales of data"));
        assert!(!md.contains("**Risks**"));
        assert!(md.contains("**User rights:** Deletion on request."));
    }

    #[test]
    fn batch_report() {
        let now = Utc::now();
        let batch = BatchResult {
            run_id: RunId::new(),
            total: 2,
            successful: 1,
            failed: 1,
            results: vec![
                BatchEntry::succeeded("https://acme.example/", analysis("Acme")),
                BatchEntry::failed("https://down.example/", "fetch failed | timeout"),
            ],
            aggregate: BatchAggregate {
                avg_privacy_score: Some(7.0),
                avg_security_score: None,
                avg_compliance_score: None,
                top_company_names: vec!["Acme".into()],
            },
            started_at: now,
            finished_at: now,
        };

        let md = batch_markdown(&batch).unwrap();
        assert!(md.starts_with("# Batch report\n"));
        assert!(md.contains("2 total, 1 succeeded, 1 failed"));
        assert!(md.contains("- **Average privacy score:** 7.0"));
        assert!(md.contains("- **Average security score:** n/a"));
        assert!(md.contains("| 1 | https://acme.example/ | ok: Acme |"));
        assert!(md.contains("failed: fetch failed \\| timeout"));
        // Site sections nest one level down.
        assert!(md.contains("\n## Acme\n"));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = to_json_pretty(&analysis("Acme")).unwrap();
        assert!(json.contains("\"companyName\": \"Acme\""));
        assert!(json.contains("\"privacyPolicyGuessed\": true"));
    }
}
