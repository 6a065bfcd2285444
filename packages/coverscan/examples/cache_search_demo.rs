use anyhow::Result;
use coverscan::prelude::*;

fn main() -> Result<()> {
    // Load the result cache written by `coverscan extract`
    let cache = ResultCache::load("hybrid_ocr_cache.json")?;

    println!("Result cache information:");
    println!("  Images: {}", cache.len());
    for (name, entry) in cache.iter() {
        println!("  {} ({} regions, {})", name, entry.total_texts, entry.method);
    }
    println!();

    let queries = vec!["private", "eye", "1642"];

    for query in queries {
        println!("Search query: '{}'", query);
        println!("{}", "=".repeat(60));

        for hit in search(&cache, query) {
            println!("{} ({} matches)", hit.filename, hit.matches);
            for region in hit.regions.iter().take(3) {
                println!(
                    "   {:>5.1}% {:>5.1}%  {}",
                    region.x_percent, region.y_percent, region.text
                );
            }
        }
        println!();
    }

    Ok(())
}
