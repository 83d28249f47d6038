use anyhow::Result;
use rateio_service::{
    bootstrap,
    config::AppConfig,
    observability,
    session::{CaptureSession, Step},
    tasks,
};
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
<value>          record and move to the next apartment
n [value]        record (default: shown value) and move to the next apartment
p [value]        record (default: shown value) and move to the previous apartment
g <block> <num>  go to an apartment
f                finish the round and write the report
q                quit";

enum Command {
    Next(Option<i64>),
    Previous(Option<i64>),
    Goto(String, i32),
    Finish,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    let value = |p: Option<&str>| -> Option<Option<i64>> {
        match p {
            None => Some(None),
            Some(v) => v.parse().ok().map(Some),
        }
    };

    let cmd = match head {
        "n" => Command::Next(value(parts.next())?),
        "p" => Command::Previous(value(parts.next())?),
        "g" => {
            let block = parts.next()?.to_string();
            let number = parts.next()?.parse().ok()?;
            Command::Goto(block, number)
        }
        "f" => Command::Finish,
        "q" => Command::Quit,
        "?" | "h" => Command::Help,
        v => Command::Next(Some(v.parse().ok()?)),
    };
    if parts.next().is_some() {
        return None;
    }
    Some(cmd)
}

async fn prompt(session: &CaptureSession) -> Result<()> {
    let apt = session.current();
    let value = session.current_value().await?;
    let mut out = stdout();
    out.write_all(
        format!("{} {} [{}]> ", apt.block, apt.formatted_number(), value).as_bytes(),
    )
    .await?;
    out.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let engine = bootstrap::build_engine(&cfg).await?;

    let mut session = CaptureSession::start(engine.clone()).await?;
    println!(
        "{}: capturing readings for {}",
        engine.condominium_name(),
        engine.readings().current_period()
    );
    println!("{HELP}");

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        prompt(&session).await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(cmd) = parse_command(&line) else {
            println!("unrecognised input, type ? for help");
            continue;
        };

        let step = match cmd {
            Command::Next(value) => {
                let value = match value {
                    Some(v) => v,
                    None => session.current_value().await?,
                };
                session.record_and_next(value).await
            }
            Command::Previous(value) => {
                let value = match value {
                    Some(v) => v,
                    None => session.current_value().await?,
                };
                session.record_and_previous(value).await
            }
            Command::Goto(block, number) => {
                if !session.jump_to(&block, number).await? {
                    println!("apartment {block} {number} is not registered");
                }
                continue;
            }
            Command::Finish => {
                let progress = session.finish_check().await?;
                if !progress.is_complete() {
                    println!(
                        "{} of {} apartments still without a reading for {}",
                        progress.missing(),
                        progress.total,
                        progress.period
                    );
                    continue;
                }
                println!("working...");
                let handle = tasks::spawn_report(engine.clone(), cfg.report.output_dir.clone());
                match tasks::join_report(handle).await {
                    Ok(path) => {
                        println!("report written to {}", path.display());
                        break;
                    }
                    Err(e) => {
                        println!("report failed: {e}");
                        continue;
                    }
                }
            }
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
        };

        match step {
            Ok(Step::Moved(_)) => {}
            Ok(Step::Boundary) => println!("end of roster"),
            Err(e) => println!("reading not saved: {e}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capture_commands() {
        assert!(matches!(parse_command("42"), Some(Command::Next(Some(42)))));
        assert!(matches!(parse_command("n"), Some(Command::Next(None))));
        assert!(matches!(parse_command("p 7"), Some(Command::Previous(Some(7)))));
        assert!(matches!(
            parse_command("g B 101"),
            Some(Command::Goto(ref b, 101)) if b == "B"
        ));
        assert!(matches!(parse_command("f"), Some(Command::Finish)));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("abc").is_none());
        assert!(parse_command("g B").is_none());
        assert!(parse_command("n 1 2").is_none());
    }
}
