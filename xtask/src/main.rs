use camino::Utf8PathBuf;
use fieldmark::student::layout_page;
use fieldmark::types::Size;
use fieldmark::{DirStore, EditorConfig, Px, TemplateDocument, TemplateStore};
use miette::{IntoDiagnostic, Result, WrapErr, miette};

fn usage() -> ! {
    eprintln!("Usage: cargo xtask <command>");
    eprintln!("Commands:");
    eprintln!("  check <dir>                                   Validate every template in a directory");
    eprintln!("  layout <dir> <template_id> <page> <w> <h>     Print student input placements for a viewport");
    std::process::exit(1);
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("check") if args.len() == 2 => check(Utf8PathBuf::from(&args[1])),
        Some("layout") if args.len() == 6 => layout(&args[1..]),
        Some(other) if other != "check" && other != "layout" => {
            eprintln!("Unknown command: {other}");
            usage()
        }
        _ => usage(),
    }
}

fn check(dir: Utf8PathBuf) -> Result<()> {
    let store = DirStore::open(dir.clone())?;
    let summaries = store.list()?;
    let mut failed = 0usize;

    for summary in &summaries {
        let id = &summary.template_id;
        let loaded = store
            .get(id)
            .and_then(TemplateDocument::from_record);
        let doc = match loaded {
            Ok(doc) => doc,
            Err(err) => {
                failed += 1;
                println!("FAIL {id}: {err}");
                continue;
            }
        };
        let issues = doc.publish_issues();
        if issues.is_empty() {
            println!(
                "ok   {id} ({} page(s), {} field(s))",
                doc.page_count(),
                doc.fields().len()
            );
        } else {
            failed += 1;
            println!("FAIL {id}");
            for issue in issues {
                println!("       - {issue}");
            }
        }
    }

    println!("{} template(s) checked in {dir}, {failed} failed", summaries.len());
    if failed > 0 {
        return Err(miette!("{failed} template(s) not ready to publish"));
    }
    Ok(())
}

fn layout(args: &[String]) -> Result<()> {
    let store = DirStore::open(Utf8PathBuf::from(&args[0]))?;
    let template_id = &args[1];
    let page: u32 = args[2]
        .parse()
        .into_diagnostic()
        .wrap_err("page must be a non-negative integer")?;
    let width: f64 = args[3].parse().into_diagnostic().wrap_err("width must be a number")?;
    let height: f64 = args[4].parse().into_diagnostic().wrap_err("height must be a number")?;

    let doc = TemplateDocument::from_record(store.get(template_id)?)?;
    let placements = layout_page(
        &doc,
        page,
        Size::new(Px(width), Px(height)),
        EditorConfig::default().student_min_width,
    )?;

    for p in placements {
        println!(
            "{}\tleft={:.1}\ttop={:.1}\twidth={:.1}\theight={:.1}",
            p.field_id, p.rect.x.0, p.rect.y.0, p.rect.w.0, p.rect.h.0
        );
    }
    Ok(())
}
