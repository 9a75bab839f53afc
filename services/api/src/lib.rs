mod cli;
mod demo;
mod housekeeping;
mod infra;
mod routes;
mod server;

use coderr::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
