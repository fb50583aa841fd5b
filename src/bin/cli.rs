use std::io::{self, Write};
use std::sync::Arc;

use curriculum_tool::views::{self, ClassEntry, RetryPolicy, display_width};
use curriculum_tool::{
    ClassFilter, IngestConfig, Ingestor, ScheduleBackend, ScheduleRow, Section, StoreConfig,
    Year, analyze_bytes, canonicalize_date, parse_canonical_date,
};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

fn push_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for (ci, cell) in cells.enumerate() {
        out.push(' ');
        out.push_str(cell);
        let pad = widths[ci].saturating_sub(display_width(cell));
        if pad > 0 {
            out.push_str(&" ".repeat(pad));
        }
        out.push_str(" |");
    }
    out.push('\n');
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            let len = display_width(cell);
            if len > widths[ci] {
                widths[ci] = len;
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, &widths, headers.iter().copied());
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        push_row(&mut out, &widths, row.iter().map(String::as_str));
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_entries(entries: &[ClassEntry]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            vec![
                entry.date.clone(),
                entry.weekday.clone(),
                entry.period.clone(),
                format!("{}{}", entry.year, entry.class),
                entry.content.clone().unwrap_or_default(),
                entry.teacher.clone().unwrap_or_default(),
                entry.period_count.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_text_table(
        &["日付", "曜日", "時限", "クラス", "授業内容", "担当講師名", "コマ数"],
        &rows,
    )
}

fn render_day(rows: &[&ScheduleRow]) -> String {
    let mut table = Vec::new();
    for row in rows {
        for (year, section, slot) in row.classes.iter() {
            if slot.is_empty() {
                continue;
            }
            table.push(vec![
                row.period.clone(),
                format!("{year}{section}"),
                slot.content.clone().unwrap_or_default(),
                slot.teacher.clone().unwrap_or_default(),
                slot.period_count.clone().unwrap_or_default(),
            ]);
        }
    }
    render_text_table(&["時限", "クラス", "授業内容", "担当講師名", "コマ数"], &table)
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  import  <path>                     Upload a schedule CSV, replacing its date range\n  analyze <path>                     Show detected encoding, headers and sample rows\n  dates                              List dates with stored rows\n  show    <year> <class>             Lessons of one class (e.g. show 1 A)\n  exams   <year> <class>             Exams and mock exams of one class\n  daily   <date>                     Every class on one date\n  instructors                        List instructor names\n  teacher <name>                     Lessons taught by one instructor\n  delete  <min_date> <max_date>      Delete rows in an inclusive date range\n  quit|exit                          Exit"
    );
}

fn parse_class(year_s: &str, class_s: &str) -> Option<ClassFilter> {
    let year = Year::from_number(year_s.parse().ok()?)?;
    let mut letters = class_s.chars();
    let section = Section::from_letter(letters.next()?.to_ascii_uppercase())?;
    if letters.next().is_some() {
        return None;
    }
    Some(ClassFilter::new(year, section))
}

fn parse_date_arg(input: &str) -> Option<String> {
    let canonical = canonicalize_date(input);
    parse_canonical_date(&canonical).map(|_| canonical)
}

fn load_rows(runtime: &Runtime, backend: &dyn ScheduleBackend) -> Option<Vec<ScheduleRow>> {
    match runtime.block_on(views::fetch_with_retry(backend, &RetryPolicy::default())) {
        Ok(rows) => Some(rows),
        Err(e) => {
            println!("Error: {}", e);
            None
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .try_init();

    let store = match StoreConfig::from_env().connect() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let backend: Arc<dyn ScheduleBackend> = Arc::new(store);
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Curriculum Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "import" => {
                let Some(path) = parts.next() else {
                    println!("Usage: import <path>");
                    continue;
                };
                let bytes = match std::fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                let ingestor = Ingestor::new(backend.clone(), IngestConfig::default())
                    .with_progress(|progress| println!("  {:>3}% {:?}", progress.percent, progress.stage));
                match runtime.block_on(ingestor.import_bytes(&bytes)) {
                    Ok(report) => {
                        println!(
                            "{} (deleted {}, inserted {} of {})",
                            report.summary(),
                            report.deleted_count,
                            report.inserted_count,
                            report.total_rows
                        );
                    }
                    Err(e) => println!("Import error: {}", e),
                }
            }
            "analyze" => {
                let Some(path) = parts.next() else {
                    println!("Usage: analyze <path>");
                    continue;
                };
                let analysis = match std::fs::read(path).map_err(|e| e.to_string()).and_then(|bytes| {
                    analyze_bytes(&bytes).map_err(|e| e.to_string())
                }) {
                    Ok(analysis) => analysis,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                println!("encoding: {}", analysis.encoding);
                println!("rows: {}", analysis.row_count);
                println!("headers: {}", analysis.headers.join(", "));
                for sample in &analysis.sample_data {
                    match serde_json::to_string(sample) {
                        Ok(json) => println!("  {}", json),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            "dates" => match runtime.block_on(backend.available_dates()) {
                Ok(dates) if dates.is_empty() => println!("No dates stored."),
                Ok(dates) => {
                    for date in dates {
                        println!("{}", date);
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            "show" | "exams" => {
                let filter = match (parts.next(), parts.next()) {
                    (Some(year_s), Some(class_s)) => match parse_class(year_s, class_s) {
                        Some(filter) => filter,
                        None => {
                            println!("Invalid class (year 1-3, class A|B|N)");
                            continue;
                        }
                    },
                    _ => {
                        println!("Usage: {} <year> <class>", cmd);
                        continue;
                    }
                };
                let Some(rows) = load_rows(&runtime, backend.as_ref()) else {
                    continue;
                };
                let entries = views::class_schedule(&rows, filter, cmd == "exams");
                if entries.is_empty() {
                    println!("No lessons for {}{}.", filter.year, filter.section);
                } else {
                    println!("{}", render_entries(&entries));
                }
            }
            "daily" => {
                let Some(date) = parts.next().and_then(parse_date_arg) else {
                    println!("Usage: daily <YYYY-MM-DD>");
                    continue;
                };
                let Some(rows) = load_rows(&runtime, backend.as_ref()) else {
                    continue;
                };
                let day = views::daily_schedule(&rows, &date);
                if day.is_empty() {
                    println!("No lessons on {}.", date);
                } else {
                    println!("{}", render_day(&day));
                }
            }
            "instructors" => {
                let Some(rows) = load_rows(&runtime, backend.as_ref()) else {
                    continue;
                };
                for name in views::instructors(&rows) {
                    println!("{}", name);
                }
            }
            "teacher" => {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    println!("Usage: teacher <name>");
                    continue;
                }
                let name = rest.join(" ");
                let Some(rows) = load_rows(&runtime, backend.as_ref()) else {
                    continue;
                };
                let entries = views::instructor_schedule(&rows, &name);
                if entries.is_empty() {
                    println!("No lessons for {}.", name);
                } else {
                    println!("{}", render_entries(&entries));
                }
            }
            "delete" => {
                let range = (
                    parts.next().and_then(parse_date_arg),
                    parts.next().and_then(parse_date_arg),
                );
                match range {
                    (Some(min), Some(max)) => {
                        match runtime.block_on(backend.delete_range(&min, &max)) {
                            Ok(deleted) => println!("Deleted {} rows from {} to {}.", deleted, min, max),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: delete <YYYY-MM-DD> <YYYY-MM-DD>"),
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
