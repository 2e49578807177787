// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::client::{invoke_sign, ClientWallet};
use crate::common::Result;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug)]
enum CliType {
    Sign,
    ShowWallet,
    ExportKeyShare,
    Quit,
}

struct CliOption {
    cli_type: CliType,
    text: String,
}

pub(crate) async fn render_cli(wallet: &ClientWallet) -> Result {
    use dialoguer::theme::ColorfulTheme;
    use dialoguer::{Confirm, Input, Select};

    loop {
        let items = vec![
            CliOption {
                cli_type: CliType::Sign,
                text: "Sign a message".to_string(),
            },
            CliOption {
                cli_type: CliType::ShowWallet,
                text: "Show wallet".to_string(),
            },
            CliOption {
                cli_type: CliType::ExportKeyShare,
                text: "Export key share".to_string(),
            },
            CliOption {
                cli_type: CliType::Quit,
                text: "Quit".to_string(),
            },
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .items(
                &items
                    .iter()
                    .map(|item| item.text.clone())
                    .collect::<Vec<String>>(),
            )
            .default(0)
            .interact_opt()?;

        match selection {
            Some(index) => match items[index].cli_type {
                CliType::Sign => {
                    let input: String = Input::new()
                        .with_prompt("Type in a message to be signed")
                        .interact_text()?;
                    invoke_sign(wallet, input.as_bytes()).await?;
                }
                CliType::ShowWallet => {
                    let master_public_key = wallet.party2.master_public_key();
                    println!(
                        "Address: {}\nPublic key: 0x{}\nScheme: {:?}",
                        master_public_key.address(),
                        master_public_key.to_hex(false),
                        wallet.party2.algorithm()
                    );
                }
                CliType::ExportKeyShare => {
                    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                        .with_prompt("The key share is secret. Print it anyway?")
                        .default(false)
                        .interact()?;
                    if confirmed {
                        println!("Key share: {}", hex::encode(wallet.backup.as_slice()));
                    }
                }
                CliType::Quit => {
                    break;
                }
            },
            None => {
                break;
            }
        }
    }

    Ok(())
}

pub(crate) fn start_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(80);
    pb.set_message("Waiting for the server to respond...");
    let waiting_style = ProgressStyle::default_spinner()
        .template("[{elapsed_precise}] {spinner:.cyan/blue} {msg:.yellow}")
        .tick_strings(&[
            "[    ]", "[=   ]", "[==  ]", "[=== ]", "[ ===]", "[  ==]", "[   =]", "[    ]",
            "[   =]", "[  ==]", "[ ===]", "[====]", "[=== ]", "[==  ]", "[=   ]",
        ]);

    pb.set_style(waiting_style);
    pb
}

pub(crate) fn finish_progress_bar(pb: ProgressBar, message: String) {
    let done_style =
        ProgressStyle::default_spinner().template("[{elapsed_precise}] {msg:.bold.green}");
    pb.set_style(done_style);
    pb.finish_with_message(message);
}
