use anyhow::Result;

// Print the OpenAPI document
fn main() -> Result<()> {
    let doc = serde_json::to_string_pretty(&ensaluto::ensaluto::openapi())?;

    println!("{doc}");

    Ok(())
}
