pub mod command;
pub mod logger;

use crate::repl::command::{parse_command, Command, Literal};
use codespan_reporting::files::SimpleFile;
use colored::Colorize;
use lexem::errors::err::LexemErr;
use lexem::memory::{BigNodeId, GcReport, Memory, MemoryConfig};
use lexem::values::{HeapValue, LexemValue, Primitive};
use log::{info, warn};
use rustyline::DefaultEditor;
use std::io;
use std::io::Write;

macro_rules! ok_or_printerr {
    ($sf:expr, $action:expr) => {
        match $action {
            Ok(v) => v,
            Err(e) => {
                e.emit($sf);
                continue;
            }
        }
    };
}

pub enum Flow {
    Continue(Option<String>),
    Exit,
}

/// a memory driven by hand, one command per line.
pub struct Shell {
    memory: Memory,
}

impl Shell {
    pub fn new(config: MemoryConfig) -> Self {
        Self { memory: Memory::new(config) }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn run_line(&mut self, line: &str) -> Result<Flow, LexemErr> {
        match parse_command(line)? {
            None => Ok(Flow::Continue(None)),
            Some(Command::Exit) => Ok(Flow::Exit),
            Some(command) => self.execute(command).map(Flow::Continue),
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Option<String>, LexemErr> {
        let output = match command {
            Command::Let { name, value } => {
                let value = self.evaluate(&value)?;
                self.memory.push_stack(&name, value)?;
                None
            }
            Command::Set { name, value } => {
                let value = self.evaluate(&value)?;
                let old = self.memory.replace_stack_data(&name, value)?;
                Some(format!("{name} was {old}"))
            }
            Command::Drop(name) => {
                let removed = self.memory.remove_from_stack(&name)?;
                Some(format!("dropped {name} = {removed}"))
            }
            Command::Get(name) => {
                let value = self.memory.get_from_stack(&name)?;
                Some(format!("{name} = {}", self.describe(value)?))
            }
            Command::Open => {
                self.memory.open_stack_level();
                None
            }
            Command::Close => {
                self.memory.close_stack_level()?;
                None
            }
            Command::Freeze => {
                let frozen = self.memory.freeze_copy();
                Some(format!("froze {frozen}, now at {}", self.memory.last_node_id()))
            }
            Command::Rollback => {
                let current = self.memory.rollback_copy()?;
                Some(format!("back at {current}"))
            }
            Command::Restore(id) => {
                let target = BigNodeId::from_raw(id);
                self.memory.restore_copy(target)?;
                Some(format!("back at {target}"))
            }
            Command::Gc { force } => {
                let report = self.memory.spatial_garbage_collect(force)?;
                return Ok(Some(report_line(&report)));
            }
            Command::Clear => {
                self.memory.clear();
                Some(format!("cleared, now at {}", self.memory.last_node_id()))
            }
            Command::Dump => Some(self.memory.to_string().trim_end().to_string()),
            Command::Help => Some(help()),
            Command::Exit => None,
        };
        if let Some(report) = self.memory.collect_if_needed()? {
            info!("threshold reached, {}", report_line(&report));
        }
        Ok(output)
    }

    /// boxes heap literals into the current snapshot, nested ones first.
    fn evaluate(&mut self, literal: &Literal) -> Result<Primitive, LexemErr> {
        let value: LexemValue = match literal {
            Literal::Nil => Primitive::Nil.into(),
            Literal::Bool(b) => Primitive::Bool(*b).into(),
            Literal::Int(i) => Primitive::Int(*i).into(),
            Literal::Float(x) => Primitive::Float(*x).into(),
            Literal::Char(c) => Primitive::Char(*c).into(),
            Literal::Name(name) => self.memory.get_from_stack(name)?.into(),
            Literal::Str(s) => HeapValue::string(&self.memory, s).into(),
            Literal::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>, _>>()?;
                HeapValue::list(&self.memory, items).into()
            }
        };
        self.memory.value_to_primitive(value)
    }

    fn describe(&self, value: Primitive) -> Result<String, LexemErr> {
        match value.as_reference() {
            Some(reference) => Ok(format!("{reference} -> {}", self.memory.get(reference)?)),
            None => Ok(value.to_string()),
        }
    }
}

fn report_line(report: &GcReport) -> String {
    if report.skipped {
        "gc: snapshot already clean".to_string()
    } else {
        format!("gc: marked {}, freed {}", report.marked, report.freed)
    }
}

fn help() -> String {
    let commands = [
        ("let NAME = VALUE", "binds NAME, shadowing an existing binding in a new level"),
        ("set NAME = VALUE", "rebinds the innermost NAME"),
        ("drop NAME", "removes the innermost NAME"),
        ("get NAME", "shows NAME and the heap value it points at"),
        ("open / close", "opens or closes a stack level"),
        ("freeze", "freezes the current snapshot"),
        ("rollback", "discards the current snapshot"),
        ("restore #ID", "goes back to an older snapshot of the chain"),
        ("gc [force]", "collects unreachable cells of the current snapshot"),
        ("clear", "drops all snapshots and starts over"),
        ("dump", "prints the current snapshot"),
        ("exit", "terminates the session"),
        ("help", "shows this message"),
    ];
    let mut out = String::from("values: 1, -2.5, 'c', \"str\", true, nil, [v, ...], NAME\n");
    for (usage, description) in commands {
        out.push_str(&format!("    {} - {description}\n", usage.underline()));
    }
    out.trim_end().to_string()
}

/// terminal hiccups (flushing, history) never end the session, they are logged and skipped.
fn warn_on_err<T, E: std::fmt::Display>(what: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("could not {what}: {e}");
            None
        }
    }
}

pub fn serve_repl(shell: &mut Shell) {
    let mut stdout = io::stdout();
    let mut input_reader = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("could not start the line editor: {e}");
            return;
        }
    };

    loop {
        warn_on_err("flush stdout", stdout.flush());
        let prompt = format!("{} >> ", shell.memory().last_node_id());
        let input = match input_reader.readline(&prompt) {
            Ok(inp) => inp,
            Err(rustyline::error::ReadlineError::Eof | rustyline::error::ReadlineError::Interrupted) => break,
            Err(_) => {
                eprintln!("Could not read input.");
                continue;
            }
        };
        warn_on_err("record history", input_reader.add_history_entry(input.as_str()));

        let sf = SimpleFile::new("repl", &input);
        match ok_or_printerr!(&sf, shell.run_line(&input)) {
            Flow::Exit => break,
            Flow::Continue(Some(output)) => println!("{output}"),
            Flow::Continue(None) => {}
        }
    }
}

/// runs every line of `source`. the first error is reported and ends the run.
pub fn run_script(shell: &mut Shell, name: &str, source: &str) -> Result<(), LexemErr> {
    for line in source.lines() {
        let line = line.to_string();
        match shell.run_line(&line) {
            Ok(Flow::Exit) => break,
            Ok(Flow::Continue(Some(output))) => println!("{output}"),
            Ok(Flow::Continue(None)) => {}
            Err(e) => {
                e.emit(&SimpleFile::new(name, &line));
                return Err(e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexem::errors::err::ErrorKind;

    fn shell() -> Shell {
        Shell::new(MemoryConfig::default())
    }

    fn run(shell: &mut Shell, line: &str) -> Option<String> {
        match shell.run_line(line).unwrap() {
            Flow::Continue(output) => output,
            Flow::Exit => panic!("unexpected exit on '{line}'"),
        }
    }

    fn fail(shell: &mut Shell, line: &str) -> ErrorKind {
        shell.run_line(line).err().unwrap_or_else(|| panic!("'{line}' should fail")).kind()
    }

    #[test]
    fn bindings_and_heap_values() {
        let mut s = shell();
        run(&mut s, "let greeting = \"hi\"");
        assert_eq!(run(&mut s, "get greeting").unwrap(), "greeting = &2 -> \"hi\"");
        run(&mut s, "let l = [1, greeting, \"x\"]");
        assert_eq!(run(&mut s, "get l").unwrap(), "l = &4 -> [1, &2, &3]");
        assert_eq!(s.memory().reference_count(lexem::values::Reference::new(2)).unwrap(), 2);
        assert_eq!(run(&mut s, "set greeting = 3").unwrap(), "greeting was &2");
        assert_eq!(s.memory().reference_count(lexem::values::Reference::new(2)).unwrap(), 1);
    }

    #[test]
    fn freeze_and_rollback() {
        let mut s = shell();
        run(&mut s, "let x = 1");
        let frozen = s.memory().last_node_id();
        assert_eq!(
            run(&mut s, "freeze").unwrap(),
            format!("froze {frozen}, now at {}", s.memory().last_node_id())
        );
        run(&mut s, "set x = 2");
        run(&mut s, "let y = \"gone\"");
        assert_eq!(run(&mut s, "rollback").unwrap(), format!("back at {frozen}"));
        assert_eq!(run(&mut s, "get x").unwrap(), "x = 1");
        assert_eq!(fail(&mut s, "get y"), ErrorKind::StackNameNotFound);
    }

    #[test]
    fn restore_by_id() {
        let mut s = shell();
        let base = s.memory().last_node_id();
        run(&mut s, "freeze");
        run(&mut s, "freeze");
        run(&mut s, &format!("restore {base}"));
        assert_eq!(s.memory().last_node_id(), base);
        assert_eq!(fail(&mut s, "restore #999"), ErrorKind::RestoreTargetNotInChain);
    }

    #[test]
    fn collection_from_the_shell() {
        let mut s = shell();
        run(&mut s, "let a = \"a\"");
        run(&mut s, "drop a");
        run(&mut s, "let b = [\"b\"]");
        run(&mut s, "open");
        run(&mut s, "let c = [b, b]");
        run(&mut s, "close");
        assert_eq!(run(&mut s, "gc").unwrap(), "gc: marked 4, freed 0");
        assert_eq!(run(&mut s, "gc").unwrap(), "gc: snapshot already clean");
        assert_eq!(run(&mut s, "gc force").unwrap(), "gc: marked 4, freed 0");
    }

    #[test]
    fn failing_commands_report_their_kind() {
        let mut s = shell();
        assert_eq!(fail(&mut s, "drop nobody"), ErrorKind::StackNameNotFound);
        assert_eq!(fail(&mut s, "close"), ErrorKind::InvalidValue);
        run(&mut s, "rollback");
        assert_eq!(fail(&mut s, "rollback"), ErrorKind::RootRollback);
        assert_eq!(fail(&mut s, "let = 3"), ErrorKind::Syntax);
    }

    #[test]
    fn exit_and_blank_lines() {
        let mut s = shell();
        assert!(matches!(s.run_line("exit").unwrap(), Flow::Exit));
        assert_eq!(run(&mut s, ""), None);
        assert!(run(&mut s, "help").unwrap().contains("restore"));
        assert!(run(&mut s, "dump").unwrap().starts_with("snapshot"));
    }

    #[test]
    fn scripts_stop_at_the_first_error() {
        let mut s = shell();
        let err = run_script(&mut s, "test", "let x = 1\nget nobody\nlet y = 2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StackNameNotFound);
        assert!(s.memory().get_from_stack("y").is_err());

        let mut s = shell();
        run_script(&mut s, "test", "let x = 1\nexit\nget nobody").unwrap();
        assert_eq!(s.memory().get_from_stack("x").unwrap(), Primitive::Int(1));
    }

    #[test]
    fn clear_drops_everything() {
        let mut s = shell();
        run(&mut s, "let x = \"x\"");
        run(&mut s, "freeze");
        run(&mut s, "clear");
        assert_eq!(s.memory().chain_len(), 2);
        assert_eq!(fail(&mut s, "get x"), ErrorKind::StackNameNotFound);
    }

    #[test]
    fn terminal_errors_are_reported_not_fatal() {
        assert_eq!(warn_on_err("flush", Ok::<_, io::Error>(3)), Some(3));
        let failed: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(warn_on_err("flush", failed), None);
    }
}
