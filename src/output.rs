use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ChainResult, DeleteResult, ExportResult};
use crate::chain::ChainMatch;
use crate::domain::{ArtistDraft, ArtistRecord};
use crate::view::View;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_view(view: &View) -> io::Result<()> {
        Self::print_json(view)
    }

    pub fn print_record(record: &ArtistRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    pub fn print_records(records: &[ArtistRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    pub fn print_delete(result: &DeleteResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_chain(result: &ChainResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_chain_match(result: &ChainMatch) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_draft(draft: &ArtistDraft) -> io::Result<()> {
        Self::print_json(draft)
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
