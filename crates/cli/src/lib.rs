//! `vatdesk` command-line front end.
//!
//! Reads JSON files, runs them through the calculator or the books, and
//! writes pretty JSON to the given writer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use vatdesk_accounting::{DashboardSummary, VatPeriod, VatReturn, VatReturnSummary};
use vatdesk_core::{CompanyId, VatReturnId};
use vatdesk_infra::{Books, BooksSnapshot};
use vatdesk_invoicing::{
    Invoice, InvoiceCalculator, InvoiceTotals, LineItemDraft, LineTotals, SubtotalBasis, VatBreakdown,
    VatConfig,
};

#[derive(Debug, Parser)]
#[command(name = "vatdesk")]
#[command(about = "Invoice totals and VAT returns")]
pub struct Cli {
    /// Standard VAT rate in percent (overrides VATDESK_STANDARD_VAT_RATE).
    #[arg(long, global = true)]
    pub vat_rate: Option<Decimal>,
    /// Subtotal basis: gross or net (overrides VATDESK_SUBTOTAL_BASIS).
    #[arg(long, global = true)]
    pub basis: Option<SubtotalBasis>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Totals for a JSON array of line items.
    Totals { file: PathBuf },
    /// Prepare a VAT return from a JSON array of invoices or a books snapshot.
    VatReturn {
        file: PathBuf,
        #[arg(long)]
        company: CompanyId,
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Dashboard figures for one company of a books snapshot.
    Dashboard {
        file: PathBuf,
        #[arg(long)]
        company: CompanyId,
        /// Reference date for overdue checks (defaults to today).
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct PeriodArgs {
    #[arg(long, requires = "to", conflicts_with_all = ["year", "quarter"])]
    pub from: Option<NaiveDate>,
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
    #[arg(long, requires = "quarter")]
    pub year: Option<i32>,
    #[arg(long, requires = "year")]
    pub quarter: Option<u32>,
}

impl PeriodArgs {
    pub fn resolve(&self) -> anyhow::Result<VatPeriod> {
        let period = match (self.from, self.to, self.year, self.quarter) {
            (Some(from), Some(to), None, None) => VatPeriod::new(from, to)?,
            (None, None, Some(year), Some(quarter)) => VatPeriod::quarter(year, quarter)?,
            _ => bail!("specify either --from and --to, or --year and --quarter"),
        };
        Ok(period)
    }
}

/// Output of `vatdesk totals`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsReport {
    pub config: VatConfig,
    pub lines: Vec<LineTotals>,
    pub totals: InvoiceTotals,
    pub breakdown: VatBreakdown,
}

pub fn run<W: Write>(cli: Cli, out: &mut W) -> anyhow::Result<()> {
    let config = resolve_config(VatConfig::from_env()?, cli.vat_rate, cli.basis)?;

    match cli.command {
        Commands::Totals { file } => {
            let drafts: Vec<LineItemDraft> = read_json(&file)?;
            write_json(out, &totals_report(&drafts, config))
        }
        Commands::VatReturn { file, company, period } => {
            let period = period.resolve()?;
            let summary = vat_return_report(read_json(&file)?, company, period, config)?;
            write_json(out, &summary)
        }
        Commands::Dashboard { file, company, today } => {
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let books = Books::from_snapshot(read_json(&file)?, config.subtotal_basis)
                .with_context(|| format!("loading books from {}", file.display()))?;
            let summary: DashboardSummary = books.dashboard(company, today)?;
            write_json(out, &summary)
        }
    }
}

/// Apply command-line overrides on top of the environment config.
pub fn resolve_config(
    base: VatConfig,
    vat_rate: Option<Decimal>,
    basis: Option<SubtotalBasis>,
) -> anyhow::Result<VatConfig> {
    let mut config = base;
    if let Some(rate) = vat_rate {
        config = config.with_standard_rate(rate).context("--vat-rate")?;
    }
    if let Some(basis) = basis {
        config.subtotal_basis = basis;
    }
    Ok(config)
}

pub fn totals_report(drafts: &[LineItemDraft], config: VatConfig) -> TotalsReport {
    let calculator = InvoiceCalculator::new(config);
    TotalsReport {
        config,
        lines: drafts
            .iter()
            .map(|line| calculator.compute_line_total(line).rounded())
            .collect(),
        totals: calculator.compute_invoice_totals(drafts).rounded(),
        breakdown: calculator.vat_breakdown(drafts).rounded(),
    }
}

/// Prepare a return from either a bare invoice array (rated with `config`)
/// or a books snapshot (rated with the company's default rate).
pub fn vat_return_report(
    input: Value,
    company: CompanyId,
    period: VatPeriod,
    config: VatConfig,
) -> anyhow::Result<VatReturnSummary> {
    let vat_return = if input.is_array() {
        let invoices: Vec<Invoice> = serde_json::from_value(input).context("parsing invoices")?;
        VatReturn::prepare(
            VatReturnId::new(),
            company,
            period,
            &invoices,
            &InvoiceCalculator::new(config),
        )
    } else {
        let snapshot: BooksSnapshot = serde_json::from_value(input).context("parsing books snapshot")?;
        let books = Books::from_snapshot(snapshot, config.subtotal_basis)?;
        books.prepare_vat_return(company, period)?
    };
    Ok(vat_return.summary())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use vatdesk_core::{CustomerId, InvoiceId};
    use vatdesk_invoicing::{Discount, InvoiceDirection, LineItem, NewInvoice, TaxCode};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vatdesk-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_totals_command_with_overrides() {
        let cli = Cli::try_parse_from(["vatdesk", "totals", "lines.json", "--vat-rate", "20", "--basis", "net"]).unwrap();
        assert_eq!(cli.vat_rate, Some(dec!(20)));
        assert_eq!(cli.basis, Some(SubtotalBasis::Net));
        assert!(matches!(cli.command, Commands::Totals { .. }));
    }

    #[test]
    fn period_flags_must_come_in_pairs() {
        let company = CompanyId::new().to_string();
        let only_from = Cli::try_parse_from([
            "vatdesk", "vat-return", "books.json", "--company", &company, "--from", "2024-01-01",
        ]);
        assert!(only_from.is_err());

        let mixed = Cli::try_parse_from([
            "vatdesk", "vat-return", "books.json", "--company", &company, "--from", "2024-01-01", "--to",
            "2024-03-31", "--year", "2024", "--quarter", "1",
        ]);
        assert!(mixed.is_err());

        assert!(PeriodArgs::default().resolve().is_err());
        let quarter = PeriodArgs {
            year: Some(2024),
            quarter: Some(2),
            ..PeriodArgs::default()
        };
        assert_eq!(quarter.resolve().unwrap(), VatPeriod::new(date(2024, 4, 1), date(2024, 6, 30)).unwrap());
    }

    #[test]
    fn resolve_config_applies_overrides() {
        let config = resolve_config(VatConfig::default(), Some(dec!(7)), Some(SubtotalBasis::Net)).unwrap();
        assert_eq!(config.standard_rate, dec!(7));
        assert_eq!(config.subtotal_basis, SubtotalBasis::Net);

        assert!(resolve_config(VatConfig::default(), Some(dec!(101)), None).is_err());
    }

    #[test]
    fn totals_report_coerces_form_rows() {
        let drafts: Vec<LineItemDraft> = serde_json::from_value(json!([
            { "description": "Consulting", "quantity": "2", "unitPrice": 50, "discount": { "type": "fixed", "value": 20 }, "taxCode": "standard" },
            { "description": "Export", "quantity": 1, "unitPrice": "abc", "taxCode": "zero" },
            { "description": "Books", "quantity": 1, "unitPrice": 30, "taxCode": "zero" }
        ]))
        .unwrap();

        let report = totals_report(&drafts, VatConfig::default());
        assert_eq!(report.lines[0].total, dec!(84));
        assert_eq!(report.lines[1].total, dec!(0));
        assert_eq!(report.totals.subtotal, dec!(130));
        assert_eq!(report.totals.discount_total, dec!(20));
        assert_eq!(report.totals.vat_amount, dec!(4));
        assert_eq!(report.totals.total, dec!(114));
        assert_eq!(report.breakdown.zero.net, dec!(30));
    }

    #[test]
    fn vat_return_from_invoice_array() {
        let company = CompanyId::new();
        let mut invoice = Invoice::draft(NewInvoice {
            id: InvoiceId::new(),
            number: "S-1".to_string(),
            direction: InvoiceDirection::Receivable,
            company_id: company,
            customer_id: CustomerId::new(),
            category_id: None,
            issue_date: date(2024, 1, 10),
            due_date: date(2024, 2, 10),
            currency: "EUR".to_string(),
            vat_rate: None,
        })
        .unwrap();
        invoice
            .add_line(LineItem::new("Service", dec!(1), dec!(200), Discount::none(), TaxCode::Standard).unwrap())
            .unwrap();
        invoice.issue().unwrap();

        let input = serde_json::to_value(vec![invoice]).unwrap();
        let period = VatPeriod::quarter(2024, 1).unwrap();
        let config = VatConfig::new(dec!(20), SubtotalBasis::Gross).unwrap();
        let summary = vat_return_report(input, company, period, config).unwrap();

        assert_eq!(summary.invoice_count, 1);
        assert_eq!(summary.output_vat, dec!(40));
        assert_eq!(summary.net_vat_payable, dec!(40));
    }

    #[test]
    fn run_writes_json_and_reports_missing_files() {
        let path = temp_file(
            "lines.json",
            r#"[{"description": "Widget", "quantity": 1, "unitPrice": 100, "taxCode": "standard"}]"#,
        );
        let cli = Cli::try_parse_from(["vatdesk", "--vat-rate", "5", "totals", path.to_str().unwrap()]).unwrap();
        let mut out = Vec::new();
        run(cli, &mut out).unwrap();
        fs::remove_file(&path).unwrap();

        let report: Value = serde_json::from_slice(&out).unwrap();
        let total: Decimal = report["totals"]["total"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, dec!(105));

        let cli = Cli::try_parse_from(["vatdesk", "totals", "/definitely/missing.json"]).unwrap();
        let err = run(cli, &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("reading /definitely/missing.json"));
    }
}
