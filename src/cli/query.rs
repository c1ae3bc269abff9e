//! Lookup command handlers.

use anyhow::{bail, Result};
use serde_json::Value;

use inspirecache::inspire::{Direction, InspireClient, SortOrder, TextFormat};

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn cmd_search(
    client: &InspireClient,
    query: &str,
    sort: SortOrder,
    size: u32,
    page: u32,
    fields: Option<&str>,
) -> Result<()> {
    let value = client
        .search_literature(query, sort, size, page, fields)
        .await?;
    print_json(&value)
}

/// Exactly one identifier is used; the positional id wins.
pub(crate) async fn cmd_paper(
    client: &InspireClient,
    id: Option<String>,
    arxiv: Option<String>,
    doi: Option<String>,
    fields: Option<&str>,
) -> Result<()> {
    let value = match (id, arxiv, doi) {
        (Some(id), _, _) => client.literature_record(&id, fields).await?,
        (None, Some(arxiv), _) => client.literature_by_arxiv(&arxiv, fields).await?,
        (None, None, Some(doi)) => client.literature_by_doi(&doi, fields).await?,
        (None, None, None) => bail!("Provide an InspireHEP record id, --arxiv or --doi"),
    };
    print_json(&value)
}

pub(crate) async fn cmd_citations(
    client: &InspireClient,
    id: &str,
    direction: Direction,
    size: u32,
) -> Result<()> {
    let value = client.citations(id, direction, size).await?;
    print_json(&value)
}

pub(crate) async fn cmd_authors(client: &InspireClient, query: &str, size: u32) -> Result<()> {
    let value = client.search_authors(query, size).await?;
    print_json(&value)
}

/// One id uses the single-record export; several are fetched as one batch.
pub(crate) async fn cmd_bibtex(
    client: &InspireClient,
    ids: &[String],
    format: TextFormat,
) -> Result<()> {
    let text = match ids {
        [id] => client.literature_text(id, format).await?,
        ids => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            client.references_text(&ids, format).await?
        }
    };
    println!("{}", text.trim_end());
    Ok(())
}
