// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of a table")
}

pub fn build_cli() -> Command {
    Command::new("finsync")
        .about("Reconcile exchange exports into typed financial records")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env("FINSYNC_DB")
                .value_parser(value_parser!(std::path::PathBuf))
                .help("SQLite database path (defaults to the platform data dir)"),
        )
        .subcommand(Command::new("init").about("Create the database and its tables"))
        .subcommand(
            Command::new("binance")
                .about("Binance account statement exports")
                .subcommand_required(true)
                .subcommand(
                    Command::new("import")
                        .about("Reconcile export files and persist the classified buckets")
                        .arg(
                            Arg::new("path")
                                .long("path")
                                .required(true)
                                .num_args(1..)
                                .action(ArgAction::Append)
                                .help("Export CSV file(s), processed in the given order"),
                        )
                        .arg(
                            Arg::new("review-out")
                                .long("review-out")
                                .value_parser(value_parser!(std::path::PathBuf))
                                .help("Write rows needing manual review to this CSV"),
                        )
                        .arg(
                            Arg::new("rules")
                                .long("rules")
                                .value_parser(value_parser!(std::path::PathBuf))
                                .help("JSON rule set replacing the built-in Binance labels"),
                        )
                        .arg(Arg::new("fiat").long("fiat").help("Fiat currency of deposits, e.g. BRL"))
                        .arg(Arg::new("exchange").long("exchange").help("Exchange name stored with swaps"))
                        .arg(
                            Arg::new("dry-run")
                                .long("dry-run")
                                .action(ArgAction::SetTrue)
                                .help("Reconcile and report without writing to the database"),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("review")
                .about("Manual review bookkeeping")
                .subcommand_required(true)
                .subcommand(
                    Command::new("resolve")
                        .about("Mark an event key as handled by hand")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(Command::new("list").about("List resolved keys").arg(json_flag()))
                .subcommand(
                    Command::new("pending")
                        .about("Show rows of a review file that are still unresolved")
                        .arg(
                            Arg::new("path")
                                .long("path")
                                .required(true)
                                .value_parser(value_parser!(std::path::PathBuf)),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Persistent settings")
                .subcommand_required(true)
                .subcommand(
                    Command::new("set")
                        .arg(
                            Arg::new("key")
                                .long("key")
                                .required(true)
                                .value_parser(["fiat_currency", "exchange_name"]),
                        )
                        .arg(Arg::new("value").long("value").required(true)),
                )
                .subcommand(Command::new("show").arg(json_flag())),
        )
        .subcommand(
            Command::new("quotes")
                .about("Daily asset quotes")
                .subcommand_required(true)
                .subcommand(
                    Command::new("fetch")
                        .arg(
                            Arg::new("provider")
                                .long("provider")
                                .required(true)
                                .value_parser(["binance", "awesome", "yahoo"]),
                        )
                        .arg(
                            Arg::new("symbol")
                                .long("symbol")
                                .required(true)
                                .help("Provider symbol, e.g. BTCBRL, USD-BRL or PETR4.SA"),
                        )
                        .arg(Arg::new("asset").long("asset").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(Arg::new("start").long("start").help("YYYY-MM-DD")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(Arg::new("asset").long("asset"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize))
                                .default_value("50"),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("stocks")
                .about("Stock trades and moving-average cost basis")
                .subcommand_required(true)
                .subcommand(
                    Command::new("import").arg(
                        Arg::new("path")
                            .long("path")
                            .required(true)
                            .value_parser(value_parser!(std::path::PathBuf))
                            .help("CSV with date,ticker,quantity,price,taxes"),
                    ),
                )
                .subcommand(
                    Command::new("report")
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .required(true)
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(Command::new("doctor").about("Sanity checks over persisted tables"))
}
