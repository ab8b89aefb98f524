//! Optional reporting sinks for a view's state.
use std::io::{self, Write};

use serde::Serialize;

use crate::models::cluster::ClusterId;

/// One cluster in a [`ViewSummary`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub rows: Vec<usize>,
    pub score: f64,
}

/// One column's prior in a [`ViewSummary`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub col_id: usize,
    pub m: f64,
    pub r: f64,
    pub s: f64,
    pub v: f64,
}

/// Snapshot of a view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewSummary {
    pub n_rows: usize,
    pub n_cols: usize,
    pub n_clusters: usize,
    pub alpha: f64,
    pub score: f64,
    pub clusters: Vec<ClusterSummary>,
    pub columns: Vec<ColumnSummary>,
}

/// Cached per-column scores of every cluster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreMatrix {
    /// Global column ids, in local order.
    pub column_ids: Vec<usize>,
    pub cluster_ids: Vec<ClusterId>,
    /// `scores[k][c]` is cluster `k`'s score for local column `c`.
    pub scores: Vec<Vec<f64>>,
}

/// Receiver of a view's diagnostic output.
pub trait Diagnostics {
    /// Called by `View::print`.
    ///
    /// # Errors
    /// If the sink cannot be written to.
    fn summary(&mut self, summary: &ViewSummary) -> io::Result<()>;

    /// Called by `View::print_score_matrix`.
    ///
    /// # Errors
    /// If the sink cannot be written to.
    fn score_matrix(&mut self, matrix: &ScoreMatrix) -> io::Result<()>;
}

/// Human readable text.
#[derive(Debug)]
pub struct WriterDiagnostics<W: Write> {
    writer: W,
}

impl<W: Write> WriterDiagnostics<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Diagnostics for WriterDiagnostics<W> {
    fn summary(&mut self, summary: &ViewSummary) -> io::Result<()> {
        writeln!(
            self.writer,
            "view: {} rows, {} cols, {} clusters, alpha = {:.6}, score = {:.6}",
            summary.n_rows, summary.n_cols, summary.n_clusters, summary.alpha, summary.score
        )?;
        for cluster in &summary.clusters {
            writeln!(
                self.writer,
                "  cluster {} (score {:.6}): {:?}",
                cluster.id, cluster.score, cluster.rows
            )?;
        }
        for col in &summary.columns {
            writeln!(
                self.writer,
                "  column {}: m = {:.6}, r = {:.6}, s = {:.6}, v = {:.6}",
                col.col_id, col.m, col.r, col.s, col.v
            )?;
        }
        Ok(())
    }

    fn score_matrix(&mut self, matrix: &ScoreMatrix) -> io::Result<()> {
        write!(self.writer, "cluster")?;
        for col in &matrix.column_ids {
            write!(self.writer, "\t{col}")?;
        }
        writeln!(self.writer)?;

        for (id, row) in matrix.cluster_ids.iter().zip(&matrix.scores) {
            write!(self.writer, "{id}")?;
            for score in row {
                write!(self.writer, "\t{score:.6}")?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

/// One JSON document per line and event.
#[derive(Debug)]
pub struct JsonDiagnostics<W: Write> {
    writer: W,
}

impl<W: Write> JsonDiagnostics<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit<T: Serialize>(&mut self, event: &'static str, body: &T) -> io::Result<()> {
        #[derive(Serialize)]
        struct Event<'a, T> {
            event: &'static str,
            body: &'a T,
        }

        serde_json::to_writer(&mut self.writer, &Event { event, body })?;
        writeln!(self.writer)
    }
}

impl<W: Write> Diagnostics for JsonDiagnostics<W> {
    fn summary(&mut self, summary: &ViewSummary) -> io::Result<()> {
        self.emit("summary", summary)
    }

    fn score_matrix(&mut self, matrix: &ScoreMatrix) -> io::Result<()> {
        self.emit("score_matrix", matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ViewSummary {
        ViewSummary {
            n_rows: 3,
            n_cols: 1,
            n_clusters: 2,
            alpha: 0.5,
            score: -4.25,
            clusters: vec![
                ClusterSummary {
                    id: ClusterId(0),
                    rows: vec![0, 2],
                    score: -3.0,
                },
                ClusterSummary {
                    id: ClusterId(4),
                    rows: vec![1],
                    score: -1.0,
                },
            ],
            columns: vec![ColumnSummary {
                col_id: 7,
                m: 0.0,
                r: 1.0,
                s: 2.0,
                v: 1.0,
            }],
        }
    }

    #[test]
    fn text_summary_lists_clusters() {
        let mut sink = WriterDiagnostics::new(Vec::new());
        sink.summary(&summary()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();

        assert!(text.starts_with("view: 3 rows, 1 cols, 2 clusters"));
        assert!(text.contains("cluster 4 (score -1.000000): [1]"));
        assert!(text.contains("column 7: m = 0.000000"));
    }

    #[test]
    fn text_score_matrix_is_tab_separated() {
        let mut sink = WriterDiagnostics::new(Vec::new());
        sink.score_matrix(&ScoreMatrix {
            column_ids: vec![3, 1],
            cluster_ids: vec![ClusterId(2)],
            scores: vec![vec![-1.5, -2.0]],
        })
        .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();

        assert_eq!(text, "cluster\t3\t1\n2\t-1.500000\t-2.000000\n");
    }

    #[test]
    fn json_events_are_line_delimited() {
        let mut sink = JsonDiagnostics::new(Vec::new());
        sink.summary(&summary()).unwrap();
        sink.summary(&summary()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();

        let docs: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["event"], "summary");
        assert_eq!(docs[0]["body"]["clusters"][1]["id"], 4);
        assert_eq!(docs[0]["body"]["clusters"][0]["rows"][1], 2);
    }
}
