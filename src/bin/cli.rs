#![cfg(not(tarpaulin_include))]

use chrono::{Local, NaiveDate};
use orderdesk::config;
use orderdesk::export;
use orderdesk::mailer::Mailer;
use orderdesk::order::Column;
use orderdesk::{LookupTable, OrderError, OrderSession, SessionError, Settings};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

fn print_help() {
    println!("Commands:");
    println!("  add: Add a blank line item");
    println!("  desc <index> <description>: Set a line item's description");
    println!("  qty <index> <quantity>: Set a line item's quantity");
    println!("  submit <YYYY-MM-DD> <business partner>: Submit pending items");
    println!("  show: Show pending items and submitted rows");
    println!("  partners / products: List lookup vocabularies");
    println!("  export [path]: Write the CSV to a file (default: output folder)");
    println!("  email [recipient]: Save the CSV and email it");
    println!("  clear: Drop pending items and submitted rows");
    println!("  q: Quit");
}

fn show(session: &OrderSession) {
    println!("Pending line items:");
    for (i, item) in session.line_items().iter().enumerate() {
        println!(
            "  {:>3}  {:<40} x{:<5} {}",
            i,
            item.description(),
            item.quantity(),
            item.product_code()
        );
    }
    println!("Order table ({} rows):", session.orders().len());
    println!("  {}", Column::headers()[..7].join(" | "));
    for row in session.orders().rows() {
        println!("  {}", row.values()[..7].join(" | "));
    }
}

fn parse_index(arg: Option<&str>) -> Result<usize, OrderError> {
    arg.and_then(|a| a.parse().ok()).ok_or_else(|| {
        SessionError::Validation("expected a line item index".to_string()).into()
    })
}

fn save_csv(
    session: &OrderSession,
    settings: &Settings,
    path: Option<&str>,
) -> Result<PathBuf, OrderError> {
    let csv = session.export_csv()?;
    let path = match path {
        Some(path) => {
            let path = PathBuf::from(path);
            export::write_file(&path, &csv)?;
            path
        }
        None => {
            let name =
                export::export_file_name(settings.timestamp_exports, Local::now().naive_local());
            export::save_export(&settings.output_dir, &name, &csv)?
        }
    };
    Ok(path)
}

fn email(
    session: &OrderSession,
    settings: &Settings,
    recipient: Option<&str>,
) -> Result<String, OrderError> {
    let mail = settings.mail.as_ref().ok_or(OrderError::MailNotConfigured)?;
    let recipient = recipient
        .map(String::from)
        .or_else(|| mail.default_recipient.clone())
        .ok_or_else(|| SessionError::Validation("expected a recipient".to_string()))?;

    let path = save_csv(session, settings, None)?;
    println!("Saved {}", path.display());

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(export::EXPORT_STEM)
        .to_string();
    let mailer = Mailer::new(mail)?;
    mailer.send_email(&recipient, &mail.subject, &mail.body, session.export_csv()?, &name)?;
    Ok(format!("sent to {}", recipient))
}

fn run_command(
    session: &mut OrderSession,
    settings: &Settings,
    command: &str,
) -> Result<String, OrderError> {
    let (verb, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();

    match verb {
        "add" => {
            let index = session.add_blank_line_item();
            Ok(format!("added item {}", index))
        }
        "desc" => {
            let (index, description) = rest.split_once(' ').unwrap_or((rest, ""));
            let item =
                session.set_line_item_description(parse_index(Some(index))?, description.trim())?;
            Ok(format!("product code '{}'", item.product_code()))
        }
        "qty" => {
            let mut args = rest.split_whitespace();
            let index = parse_index(args.next())?;
            let quantity = args
                .next()
                .and_then(|q| q.parse::<i64>().ok())
                .ok_or_else(|| SessionError::Validation("expected a quantity".to_string()))?;
            session.set_line_item_quantity(index, quantity)?;
            Ok("ok".to_string())
        }
        "submit" => {
            let (date, partner) = rest.split_once(' ').unwrap_or((rest, ""));
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| SessionError::Validation(format!("invalid date '{}'", date)))?;
            let count = session.submit(partner, date)?;
            Ok(format!("submitted {} items", count))
        }
        "show" => {
            show(session);
            Ok("ok".to_string())
        }
        "partners" => {
            for partner in session.lookup().partners() {
                println!("  {}", partner);
            }
            Ok("ok".to_string())
        }
        "products" => {
            for description in session.lookup().descriptions() {
                let code = session.lookup().product_code(description).unwrap_or_default();
                println!("  {:<40} {}", description, code);
            }
            Ok("ok".to_string())
        }
        "export" => {
            let path = save_csv(session, settings, (!rest.is_empty()).then_some(rest))?;
            Ok(format!("wrote {}", path.display()))
        }
        "email" => email(session, settings, (!rest.is_empty()).then_some(rest)),
        "clear" => {
            session.clear();
            Ok("ok".to_string())
        }
        _ => Ok("invalid command".to_string()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let settings = config::load_settings(config_path.as_deref())?;

    let (lookup, warning) =
        LookupTable::load_or_empty(&settings.lookup_path, &settings.lookup_columns);
    if let Some(warning) = warning {
        eprintln!("Warning: {}", warning);
    }
    let mut session = OrderSession::new(Arc::new(lookup), settings.order_defaults.clone());

    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    loop {
        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();

        start_time = Instant::now();

        if command.is_empty() {
            status = String::from("invalid command");
            continue;
        }
        if command == "help" {
            print_help();
            continue;
        }
        if command == "q" {
            break;
        }

        // Every failure is reported and the session carries on
        status = match run_command(&mut session, &settings, command) {
            Ok(message) => message,
            Err(e) => e.to_string(),
        };
    }

    Ok(())
}
