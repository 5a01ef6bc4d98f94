//! Terminal UI utilities.
//!
//! A small auto-sizing table with Unicode box-drawing characters, used by
//! `mx list` and `mx doctor`.

use colored::*;
use std::cmp;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn print(&self) {
        if self.headers.is_empty() {
            return;
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = cmp::max(widths[i], visible_len(cell));
            }
        }

        // shrink the widest columns until the table fits the terminal
        let term_width = console::Term::stdout().size().1 as usize;
        let overhead = 3 + 3 * self.headers.len();
        while widths.iter().sum::<usize>() + overhead > term_width {
            match widths.iter().enumerate().max_by_key(|(_, w)| **w) {
                Some((i, w)) if *w > 8 => widths[i] -= 1,
                _ => break,
            }
        }

        let sep = |left: &str, mid: &str, right: &str| {
            let mut s = String::from("  ");
            s.push_str(left);
            for (i, w) in widths.iter().enumerate() {
                s.push_str(&"─".repeat(w + 2));
                s.push_str(if i + 1 < widths.len() { mid } else { right });
            }
            s
        };

        println!("{}", sep("┌", "┬", "┐"));
        print!("  │");
        for (i, header) in self.headers.iter().enumerate() {
            let text = truncate(header, widths[i]);
            let pad = widths[i].saturating_sub(text.chars().count());
            print!(" {}{} │", text.bold(), " ".repeat(pad));
        }
        println!();
        println!("{}", sep("├", "┼", "┤"));

        for row in &self.rows {
            print!("  │");
            for (i, cell) in row.iter().enumerate() {
                let text = console::truncate_str(cell, widths[i], "...").to_string();
                let pad = widths[i].saturating_sub(visible_len(&text));
                print!(" {}{} │", text, " ".repeat(pad));
            }
            println!();
        }
        println!("{}", sep("└", "┴", "┘"));
    }
}

fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let mut out: String = s.chars().take(max_width.saturating_sub(3)).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

fn visible_len(s: &str) -> usize {
    console::strip_ansi_codes(s).chars().count()
}
