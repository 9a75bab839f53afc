mod accounts;
mod common;
mod maintenance;
mod reviews;
