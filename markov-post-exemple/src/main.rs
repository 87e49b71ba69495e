use std::env;

use log::info;
use markov_post_core::config::{CountRange, GenerationConfig};
use markov_post_core::rate_limit::RateLimiter;
use markov_post_core::{Config, Generator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Text file to learn from, one paragraph per line.
    // A 'corpus.bin' cache is written next to it on the first run
    // and loaded directly afterwards
    let path = env::args().nth(1).unwrap_or_else(|| "./data/corpus.txt".to_owned());

    // Defaults: order 1, 4 to 8 paragraphs, 2 to 6 sentences each,
    // 10 000 attempts per sentence, 50 requests per 10 minutes
    let mut config = Config::default();

    // A higher order gives more coherent but less varied text
    config.generation.order = 1;

    // Keep the demo output short
    config.generation.paragraphs = CountRange(2, 3);

    // Invalid ranges are refused before anything is built
    let invalid = GenerationConfig { sentences: CountRange(6, 2), ..config.generation.clone() };
    match invalid.validate() {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Refused: {e}"),
    }

    let generator = Generator::from_file(&path, config.generation.clone())?;
    info!(
        "Model of {} has {} states (order {})",
        path,
        generator.model().state_count(),
        generator.config().order
    );

    // A single sentence, handy as a title
    let mut rng = rand::rng();
    match generator.sentence(&mut rng) {
        Ok(title) => println!("# {title}\n"),
        Err(e) if e.is_insufficient_material() => println!("Not enough text in {path}: {e}"),
        Err(e) => return Err(e.into()),
    }

    // The limiter gates each generation; the exemple plays a single caller
    let limiter = RateLimiter::in_memory(config.rate_limit.clone());
    for i in 0..3 {
        let limit = limiter.check("exemple", "local");
        println!("Request {}: allowed={} left={} reset={}s", i + 1, limit.allowed, limit.left, limit.reset_seconds);
        if !limit.allowed {
            break;
        }

        match generator.document(&mut rng) {
            Ok(document) => println!("{document}\n"),
            Err(e) if e.is_insufficient_material() => println!("Not enough text in {path}: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
