use std::env;

use tracing_subscriber::EnvFilter;

use dreamlog::config::ClientConfig;
use dreamlog::models::generation::JobState;
use dreamlog::services::entries::EntriesApi;
use dreamlog::services::generation::GenerationClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env().expect("Failed to load configuration from environment");

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&config, &args[1..]).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &ClientConfig, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let entries = EntriesApi::new(&config.api_base_url);

    match args.first().map(String::as_str) {
        Some("list") => {
            for entry in entries.list().await? {
                let marker = if entry.image_url.is_some() { "*" } else { " " };
                println!("{} {:>4}  {}", marker, entry.id, entry.text);
            }
        }
        Some("show") => {
            let entry = entries.get(parse_id(args.get(1))?).await?;
            println!("#{} ({})", entry.id, entry.created_at);
            println!("{}", entry.text);
            if let Some(url) = &entry.image_url {
                println!("image: {url}");
            }
        }
        Some("create") => {
            let text = args.get(1).ok_or("missing entry text")?;
            let entry = entries.create(text).await?;
            println!("created entry {}", entry.id);
        }
        Some("update") => {
            let id = parse_id(args.get(1))?;
            let text = args.get(2).ok_or("missing entry text")?;
            entries.update(id, text).await?;
            println!("updated entry {id}");
        }
        Some("delete") => {
            let id = parse_id(args.get(1))?;
            entries.delete(id).await?;
            println!("deleted entry {id}");
        }
        Some("generate") => {
            let id = parse_id(args.get(1))?;
            let generation =
                GenerationClient::new(&config.api_base_url).with_policy(config.poll_policy());

            let state = generation
                .generate(id, |update| match update.position {
                    Some(p) if p > 0 => eprintln!("[queue {}] {}", p, update.message),
                    _ => eprintln!("{}", update.message),
                })
                .await?;

            match state {
                JobState::Succeeded { image_url } => println!("image ready: {image_url}"),
                JobState::NotStarted => println!("no generation in progress for entry {id}"),
                JobState::Failed { message, .. } => {
                    return Err(format!("generation failed: {message}").into())
                }
                other => return Err(format!("unexpected job state: {other:?}").into()),
            }
        }
        _ => {
            eprintln!(
                "usage: dreamlog <command>\n\
                 \n\
                 commands:\n\
                 \x20 list                  list journal entries\n\
                 \x20 show <id>             show one entry\n\
                 \x20 create <text>         create an entry\n\
                 \x20 update <id> <text>    replace an entry's text\n\
                 \x20 delete <id>           delete an entry\n\
                 \x20 generate <id>         generate an illustration and wait for it"
            );
            std::process::exit(2);
        }
    }

    Ok(())
}

fn parse_id(arg: Option<&String>) -> Result<u64, Box<dyn std::error::Error>> {
    let raw = arg.ok_or("missing entry id")?;
    Ok(raw.parse()?)
}
