mod args;
mod fuse;
mod op;
mod ops;
mod process;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Cat, Init, Ls, Mount, Version};

command_enum! {
    (Init, Init),
    (Mount, Mount),
    (Ls, Ls),
    (Cat, Cat),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let ctx = op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
