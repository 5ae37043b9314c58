/// Plain-text tables for console output.
use crate::catalog::SummaryRow;
use crate::pipeline::{FileReport, Report};

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(format_row(headers.to_vec()));
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    for row in rows {
        let cells: Vec<&str> = (0..headers.len()).map(|i| row.get(i).map(String::as_str).unwrap_or("")).collect();
        out.push(format_row(cells));
    }
    out.join("\n")
}

/// One row per frame of one file, as printed by the verbose tag listing.
pub fn render_file_tags(file: &FileReport) -> String {
    let rows: Vec<Vec<String>> = file
        .tags
        .iter()
        .map(|t| vec![file.display_name.clone(), t.id.clone(), t.description.clone(), t.value.clone()])
        .collect();
    render_table(&["file", "tag", "description", "data"], &rows)
}

pub fn render_resolutions(report: &Report) -> String {
    let rows: Vec<Vec<String>> = report
        .files
        .iter()
        .map(|f| {
            vec![
                f.display_name.clone(),
                f.resolved.track_number.to_string(),
                f.resolved.artist.clone(),
                f.resolved.album.clone(),
                f.resolved.title.clone(),
                f.target.as_ref().map(|t| t.display().to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&["file", "track", "artist", "album", "title", "target"], &rows)
}

pub fn render_summary(rows: &[SummaryRow]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.path.display().to_string(),
                r.query.clone(),
                r.file_count.to_string(),
                r.match_count.to_string(),
                r.best_artist.clone().unwrap_or_default(),
                r.best_title.clone().unwrap_or_default(),
                r.best_track_count.map(|c| c.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&["path", "query", "files", "matches", "artist", "title", "tracks"], &rows)
}
