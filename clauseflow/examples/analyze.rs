//! Runs the standard pipeline over a sample contract with a scripted
//! generator, printing the result as JSON.
//!
//! ```sh
//! cargo run --example analyze
//! ```

use clauseflow::prelude::*;
use clauseflow::testing::MockGenerator;
use std::sync::Arc;

const SAMPLE_CONTRACT: &str = "\
SERVICES AGREEMENT

This agreement is made on 1/15/2024 between Acme Corp (the \"Vendor\") and
Jane Doe (the \"Client\").

1. The Vendor shall deliver the services in a timely manner.
2. Payment is due within a reasonable time after invoicing.
3. Either party may terminate this agreement at its discretion.
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clauseflow=info".into()),
        )
        .init();

    let generator = Arc::new(MockGenerator::with_default_response(
        "Clause: payment within a reasonable time\n\
         Risk: no concrete deadline\n\
         Impact: payment disputes\n\
         Name: Acme Corp\n\
         Type: corporation\n\
         Role: vendor\n",
    ));

    let mut templates = TemplateStore::new();
    templates.insert(Template::new(
        "termination",
        "Either party may terminate this agreement with thirty (30) days written notice.",
    ));

    let pipeline = standard_pipeline(
        generator,
        Arc::new(templates),
        Arc::new(TemplateStore::new()),
    )?;

    let result = pipeline.run(SAMPLE_CONTRACT, None).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
