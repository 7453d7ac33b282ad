//! Run only the product-search path

use anyhow::Result;

use crate::context::AppContext;

pub async fn run(context: &AppContext, question: &str, dry_run: bool) -> Result<()> {
    let responder = context.sql_responder();

    if dry_run {
        let query = responder.synthesize(question).await?;
        println!("{}", query);
        return Ok(());
    }

    let answer = responder.answer_detailed(question).await?;
    println!("Query: {}", answer.query);
    println!("Rows: {}", answer.row_count);
    println!();
    println!("{}", answer.text);
    Ok(())
}
