mod cli;
mod infra;
mod routes;
mod server;
mod submit;

use resume_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
