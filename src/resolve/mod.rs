//! Resolution aggregator: drives normalization, segmentation, directory
//! search and the filter pipeline per author and per affiliation, and keeps
//! the resolution cache current.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::cache::{CacheEntry, ResolutionCache};
use crate::hal::{DirectoryClient, HalClient, RefQuery, Validity};
use crate::pipeline::{self, ResolutionContext};
use crate::{country, normalize, push_unique};
use crate::{Affiliation, AuthorName, AuthorRecord, DocumentRecord, ResolutionOutcome};

mod ingest;
pub use ingest::{parse_document, read_documents};

#[derive(Args)]
pub struct ResolveArgs {
    /// Document dump: a .jsonl/.jsonl.gz file or a directory of them
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory (report, resolved records, cache)
    #[arg(short, long)]
    pub output: PathBuf,

    /// HAL API base URL
    #[arg(short = 'u', long, default_value = "https://api.archives-ouvertes.fr")]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "30")]
    pub timeout: u64,

    /// Retry attempts per request
    #[arg(short, long, default_value = "3")]
    pub retries: u32,

    /// Directory home country; affiliations there never get an invalid-mode pass
    #[arg(long, default_value = "fr")]
    pub home_country: String,
}

/// Row of the per-author report table.
#[derive(Debug, Serialize)]
struct AuthorReportRow {
    #[serde(rename = "documentId")]
    document_id: String,
    author: String,
    affil_id: String,
    affil_id_invalid: String,
    affil_status: String,
    affil_not_found_in_hal: String,
}

pub fn run(args: ResolveArgs) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(args))
}

pub async fn run_async(args: ResolveArgs) -> Result<()> {
    fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let mut documents = read_documents(&args.input)?;
    info!("Loaded {} documents", documents.len());

    let cache_path = args.output.join("resolution_cache.csv");
    let cache = ResolutionCache::load(&cache_path).context("Failed to load resolution cache")?;
    if !cache.is_empty() {
        info!("Resolution cache holds {} entries", cache.len());
    }

    let client = HalClient::new(args.base_url.clone(), args.timeout, args.retries);
    let mut resolver = Resolver::new(client, cache, args.home_country.clone());

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    for document in &mut documents {
        let document_id = document.document_id.clone();
        for author in &mut document.authors {
            resolver.resolve_author(&document_id, author).await;
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    write_outputs(&args.output, &documents)?;
    resolver.cache.save().context("Failed to save resolution cache")?;

    info!("Resolution complete");
    Ok(())
}

fn write_outputs(output: &std::path::Path, documents: &[DocumentRecord]) -> Result<()> {
    let records_path = output.join("resolved_documents.jsonl");
    let file = File::create(&records_path)
        .with_context(|| format!("Failed to create {}", records_path.display()))?;
    let mut writer = BufWriter::new(file);
    for document in documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let report_path = output.join("resolved_authors.csv");
    let file = File::create(&report_path)
        .with_context(|| format!("Failed to create {}", report_path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    for document in documents {
        for author in &document.authors {
            writer.serialize(AuthorReportRow {
                document_id: document.document_id.clone(),
                author: author.name().full(),
                affil_id: author.affil_ids.join(", "),
                affil_id_invalid: author.affil_ids_invalid.join(", "),
                affil_status: author
                    .affil_status
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                affil_not_found_in_hal: author.affil_not_found.join("; "),
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Per-batch resolution engine. Generic over the directory client so tests
/// can substitute scripted doubles.
pub struct Resolver<C: DirectoryClient> {
    pub directory: C,
    pub cache: ResolutionCache,
    home_country: String,
}

impl<C: DirectoryClient> Resolver<C> {
    pub fn new(directory: C, cache: ResolutionCache, home_country: String) -> Self {
        Self {
            directory,
            cache,
            home_country: home_country.to_lowercase(),
        }
    }

    /// Resolve every affiliation of one author. Failures are scoped to the
    /// single affiliation unit; this never aborts the batch.
    pub async fn resolve_author(&mut self, document_id: &str, author: &mut AuthorRecord) {
        // Ids supplied by a trusted local directory take precedence; search
        // is only for unresolved affiliations.
        if !author.affil_ids.is_empty() {
            return;
        }

        let author_name = author.name();
        let affiliations = author.affiliations.clone();

        for affil in &affiliations {
            let city = affil.city.as_deref().filter(|c| !c.trim().is_empty());

            if let Some(entry) =
                self.cache
                    .lookup(&affil.name, &author_name.full(), document_id, city)
            {
                apply_outcome(author, &entry.outcome());
                continue;
            }

            let outcome = self
                .resolve_affiliation(affil, &author_name)
                .await;
            apply_outcome(author, &outcome);
            self.cache.record(CacheEntry::from_outcome(
                &outcome,
                &affil.name,
                document_id,
                &author_name,
                city,
            ));
        }
    }

    /// Resolve one affiliation string through the full unit-by-unit search.
    pub async fn resolve_affiliation(
        &self,
        affil: &Affiliation,
        author: &AuthorName,
    ) -> ResolutionOutcome {
        let mut country: Option<String> = affil
            .country
            .as_deref()
            .and_then(country::to_alpha2)
            .map(String::from);
        let city = affil.city.as_deref().filter(|c| !c.trim().is_empty());

        let prepared = normalize::preprocess(&affil.name, country.as_deref());
        let units = normalize::segment(&prepared);

        let mut valid_ids: Vec<String> = Vec::new();
        let mut valid_labels: Vec<String> = Vec::new();
        let mut parent_acc: HashSet<String> = HashSet::new();

        // Largest (parent-most) unit first.
        for unit in units.iter().rev() {
            let query = RefQuery::text_matches(unit).with_validity(Validity::Valid);
            let candidates = match self.directory.search_structures(&query).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(unit = %unit, "structure search failed, unit unresolved: {e}");
                    continue;
                }
            };

            let ctx = ResolutionContext {
                name: unit,
                country: country.as_deref(),
                city,
                author,
                parent_ids: &parent_acc,
                invalid_search: false,
            };

            if let Some(best) = pipeline::resolve(candidates, &ctx, &self.directory).await {
                push_unique(&mut valid_ids, &best.docid);
                push_unique(&mut valid_labels, &best.label);
                parent_acc.insert(best.docid.clone());

                // VALID parents stack onto the resolved set and bias the
                // parent filter for the remaining units.
                for (parent_id, parent_label) in best.valid_parents() {
                    push_unique(&mut valid_ids, &parent_id);
                    if let Some(label) = parent_label {
                        push_unique(&mut valid_labels, &label);
                    }
                    parent_acc.insert(parent_id);
                }

                if country.is_none() {
                    country = best.country.clone();
                }
            }
        }

        if !valid_ids.is_empty() {
            return ResolutionOutcome::Valid {
                ids: valid_ids,
                labels: valid_labels,
            };
        }

        // Nothing validated matched. Outside the directory's home country it
        // is still worth knowing whether the entry exists unvetted.
        if let Some(code) = &country {
            if !code.is_empty() && code.to_lowercase() != self.home_country {
                if let Some(best) = self.search_invalid(affil, author, city).await {
                    return ResolutionOutcome::Invalid {
                        ids: vec![best.0],
                        labels: vec![best.1],
                    };
                }
            }
        }

        ResolutionOutcome::NotFound {
            name: affil.name.clone(),
        }
    }

    async fn search_invalid(
        &self,
        affil: &Affiliation,
        author: &AuthorName,
        city: Option<&str>,
    ) -> Option<(String, String)> {
        let query = RefQuery::text_exact(&affil.name);
        let candidates = match self.directory.search_structures(&query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(name = %affil.name, "invalid-affiliation search failed: {e}");
                return None;
            }
        };

        let parent_acc = HashSet::new();
        let ctx = ResolutionContext {
            name: &affil.name,
            country: None,
            city,
            author,
            parent_ids: &parent_acc,
            invalid_search: true,
        };

        pipeline::resolve(candidates, &ctx, &self.directory)
            .await
            .map(|best| (best.docid, best.label))
    }
}

fn apply_outcome(author: &mut AuthorRecord, outcome: &ResolutionOutcome) {
    match outcome {
        ResolutionOutcome::Valid { ids, .. } => {
            for id in ids {
                push_unique(&mut author.affil_ids, id);
            }
        }
        ResolutionOutcome::Invalid { ids, .. } => {
            for id in ids {
                push_unique(&mut author.affil_ids_invalid, id);
            }
        }
        ResolutionOutcome::NotFound { name } => {
            author.affil_not_found.push(name.clone());
        }
    }
    author.affil_status.push(outcome.status());
}
