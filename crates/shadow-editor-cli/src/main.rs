use anyhow::{Context, Result, anyhow, bail};
use log::LevelFilter;
use shadow_editor_config::{Config, EditorSettings};
use shadow_editor_engine::{
    ChangeContext, Editor, EditorEvent, EditorOptions, EventQueue, MemoryHost, UpdateSpec,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use std::{env, process};

const HELP: &str = "\
commands:
  text                      print the document text
  markup                    print the document markup
  tree                      print the shadow tree
  insert <pos> <text>       insert plain text
  replace <s> <e> <markup>  replace a text range with markup
  highlight <s> <e>         highlight a range
  clear <s> <e>             clear highlights inside a range
  clear-all                 clear every highlight
  caret <pos>               move the caret
  update <s> <e> <json>     apply an attribute update to a range
  undo                      restore the previous snapshot
  flush                     run the pending diff pass now
  quit";

fn options(settings: &EditorSettings) -> EditorOptions {
    EditorOptions {
        debounce: Duration::from_millis(settings.debounce_ms),
        history_capacity: settings.history_capacity,
        wrap_tag: settings.wrap_tag.clone(),
        nest_tag: settings.nest_tag.clone(),
        highlight_tag: settings.highlight_tag.clone(),
        highlight_attribute: settings.highlight_attribute.clone(),
    }
}

fn load_document(path: Option<&PathBuf>) -> Result<MemoryHost> {
    let Some(path) = path else {
        return Ok(MemoryHost::new());
    };
    let markup = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    MemoryHost::from_markup(&markup).with_context(|| format!("failed to parse {}", path.display()))
}

fn number(arg: Option<&str>, name: &str) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("missing <{name}>"))?;
    arg.parse()
        .with_context(|| format!("<{name}> must be a number, got {arg:?}"))
}

/// Runs one command line. Returns `false` on quit.
fn execute(editor: &mut Editor<MemoryHost>, line: &str) -> Result<bool> {
    // Only the command word is trimmed; `insert` keeps its text verbatim.
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let mut args = rest.trim().splitn(3, ' ');

    match command.trim_end() {
        "" => {}
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Ok(false),
        "text" => println!("{}", editor.text()),
        "markup" => println!("{}", editor.markup()),
        "tree" => print!("{}", editor.tree().dump()),
        "insert" => {
            let (position, text) = rest
                .split_once(' ')
                .ok_or_else(|| anyhow!("usage: insert <pos> <text>"))?;
            let position = number(Some(position), "pos")?;
            editor.insert_text(text, position)?;
        }
        "replace" => {
            let start = number(args.next(), "s")?;
            let end = number(args.next(), "e")?;
            let markup = args.next().unwrap_or("");
            editor.replace_text_with_html(start, end, markup, ChangeContext::from_source("cli"))?;
        }
        "highlight" => {
            let start = number(args.next(), "s")?;
            let end = number(args.next(), "e")?;
            if !editor.highlight_range(start, end)? {
                println!("nothing highlighted");
            }
        }
        "clear" => {
            let start = number(args.next(), "s")?;
            let end = number(args.next(), "e")?;
            println!("cleared {}", editor.clear_highlight_for_range(start, end)?);
        }
        "clear-all" => println!("cleared {}", editor.clear_all_highlights()?),
        "caret" => {
            let position = number(args.next(), "pos")?;
            editor.set_current_position(position, true)?;
        }
        "update" => {
            let start = number(args.next(), "s")?;
            let end = number(args.next(), "e")?;
            let json = args.next().ok_or_else(|| anyhow!("missing <json>"))?;
            let value: serde_json::Value = serde_json::from_str(json)?;
            let spec = UpdateSpec::from_json(&value)?;
            let selection = editor.select_range(start, end)?;
            let changed = editor.update(&selection, &spec)?;
            println!("updated {} node(s)", changed.len());
        }
        "undo" => editor.undo()?,
        "flush" => {
            editor.flush()?;
        }
        other => bail!("unknown command {other:?}, try `help`"),
    }
    Ok(true)
}

fn print_events(events: &EventQueue) {
    for event in events.drain() {
        match event {
            EditorEvent::TextInserted { position, text } => {
                println!("  + {position} {text:?}")
            }
            EditorEvent::TextRemoved { start, end } => println!("  - [{start}, {end})"),
            EditorEvent::SelectionUpdated(selection) => {
                println!("  selection {}..{}", selection.anchor, selection.focus)
            }
            EditorEvent::ElementUpdated => println!("  element updated"),
            EditorEvent::ContentUpdated(context) => match context.source {
                Some(source) => println!("  content updated ({source})"),
                None => println!("  content updated"),
            },
        }
    }
}

fn run() -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            log::warn!("{e}, using defaults");
            Config::default()
        }
    };
    let document = env::args().nth(1).map(PathBuf::from).or(config.document);

    let host = load_document(document.as_ref())?;
    let events = EventQueue::new();
    let mut editor = Editor::new(host, options(&config.editor))?.with_listener(events.clone());
    log::info!(
        "editing {}",
        document
            .as_ref()
            .map_or("an empty document".to_string(), |p| p.display().to_string())
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match execute(&mut editor, &line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
        if let Err(e) = editor.poll() {
            eprintln!("error: {e:#}");
        }
        print_events(&events);
    }

    editor.flush()?;
    print_events(&events);
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn editor(markup: &str) -> Editor<MemoryHost> {
        Editor::new(
            MemoryHost::from_markup(markup).unwrap(),
            EditorOptions::default(),
        )
        .unwrap()
    }

    #[rstest]
    #[case::word("insert 2 cd\n", "abcd")]
    #[case::trailing_space("insert 2 c \n", "abc ")]
    #[case::lone_space("insert 1  \n", "a b")]
    fn insert_keeps_the_text_as_typed(#[case] line: &str, #[case] expected: &str) {
        let mut editor = editor("<p>ab</p>");
        assert!(execute(&mut editor, line).unwrap());
        assert_eq!(editor.text(), expected);
    }

    #[test]
    fn surrounding_whitespace_does_not_change_the_command() {
        let mut editor = editor("<p>ab</p>");
        assert!(!execute(&mut editor, "  quit \r\n").unwrap());
        assert!(execute(&mut editor, "   \n").unwrap());
        assert!(execute(&mut editor, "caret 1 \n").unwrap());
        assert_eq!(editor.selection().anchor, 1);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut editor = editor("<p>ab</p>");
        assert!(execute(&mut editor, "frobnicate\n").is_err());
    }
}
