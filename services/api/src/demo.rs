use crate::infra::{bootstrap, open_marketplace, Marketplace};
use clap::Args;
use coderr::error::AppError;
use coderr::marketplace::{DemoAccounts, DEMO_PASSWORD};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the JSON snapshot file the demo data is written to
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
    /// Skip printing the base-info payload
    #[arg(long)]
    pub(crate) quiet: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = bootstrap(args.data_file)?;
    let service = open_marketplace(&config.marketplace)?;
    if config.marketplace.data_file.is_none() {
        println!("Note: no data file configured, the demo data is discarded on exit.");
    }
    let accounts = service.seed_demo()?;
    println!("{}", render_accounts(&accounts));
    if !args.quiet {
        println!("{}", base_info_payload(&service)?);
    }
    Ok(())
}

fn render_accounts(accounts: &DemoAccounts) -> String {
    let sample = if accounts.sample_created {
        "created a sample offer with a completed order and a review"
    } else {
        "sample data already present"
    };
    [
        "Coderr demo accounts".to_string(),
        format!(
            "  customer  andrey  (user {})  token {}",
            accounts.customer, accounts.customer_token
        ),
        format!(
            "  business  kevin   (user {})  token {}",
            accounts.business, accounts.business_token
        ),
        format!("  password  {DEMO_PASSWORD}"),
        format!("  {sample}"),
    ]
    .join("\n")
}

fn base_info_payload(service: &Marketplace) -> Result<String, AppError> {
    let info = service.base_info()?;
    Ok(match serde_json::to_string_pretty(&info) {
        Ok(json) => format!("Public base-info payload:\n{json}"),
        Err(err) => format!("Public base-info payload unavailable: {err}"),
    })
}
