// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! To run this, spin up Party1 as a server in one terminal:
//! `cargo run --example network -- -r server -p 8000`
//!
//! Then, spin up a wallet client which connects to it:
//! `cargo run --example network -- -r client -s 8000`
//!
//! Both sides have to agree on the key splitting scheme, which is picked with
//! `-a additive` (the default) or `-a multiplicative`.

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate anyhow;

mod cli;
mod client;
mod common;
mod server;

use clap::Parser;
use client::client_main;
use common::{Args, Result, RoleType};
use server::server_main;

#[rocket::main]
async fn main() -> Result {
    let args = Args::parse();

    match args.role {
        RoleType::Server => {
            server_main(args).await?;
        }
        RoleType::Client => {
            client_main(args).await?;
        }
    }

    Ok(())
}
