//! Interactive demo shell assembled from the repline building blocks.
//!
//! Shows the typical wiring: two modes (a default one and an `admin` mode
//! entered and left at runtime), a variable-substitution preprocessor, and an
//! argh-parsed command. Run it, type `help`, and poke around.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use argh::FromArgs;
use repline::{CommandLine, CommandResult, Preprocessor, PromptColor, RustylineBackend, VarEngine};

/// An interactive demo shell with modes, completion, and variables.
#[derive(FromArgs)]
struct DemoArgs {
    /// file used to persist command history
    #[argh(option)]
    history: Option<PathBuf>,

    /// disable prompt colors
    #[argh(switch)]
    no_color: bool,
}

/// Print a greeting.
#[derive(FromArgs)]
struct GreetArgs {
    /// shout the greeting
    #[argh(switch, short = 'l')]
    loud: bool,

    /// who to greet
    #[argh(positional, greedy)]
    name: Vec<String>,
}

/// Things a command handler asks the main loop to do once dispatch returned.
/// Handlers cannot touch the dispatcher directly while it is executing them.
enum Action {
    Quit,
    Help,
    EnterAdmin,
    LeaveAdmin,
}

fn greet(args: &str) -> CommandResult {
    let argv: Vec<&str> = args.split_whitespace().collect();
    match GreetArgs::from_args(&["greet"], &argv) {
        Ok(greet) => {
            let name = if greet.name.is_empty() {
                "you".to_string()
            } else {
                greet.name.join(" ")
            };
            let text = format!("hello, {name}!");
            if greet.loud {
                println!("{}", text.to_uppercase());
            } else {
                println!("{text}");
            }
            CommandResult::Executed
        }
        Err(early_exit) => {
            println!("{}", early_exit.output);
            CommandResult::Executed
        }
    }
}

fn build_cli(
    args: &DemoArgs,
    pending: &Rc<RefCell<Option<Action>>>,
    vars: &Rc<RefCell<VarEngine>>,
) -> Result<CommandLine<RustylineBackend>> {
    let color = |c| if args.no_color { None } else { Some(c) };
    let mut cli = CommandLine::<RustylineBackend>::new();

    let main = cli
        .mode_add("repline", "repline> ", color(PromptColor::Green), args.history.clone())?
        .unwrap();
    {
        let mut main = main.borrow_mut();
        let p = pending.clone();
        main.add_with("help", "list available commands", move |_| {
            *p.borrow_mut() = Some(Action::Help);
            CommandResult::Executed
        });
        let p = pending.clone();
        main.add_with("quit", "terminate the shell", move |_| {
            *p.borrow_mut() = Some(Action::Quit);
            CommandResult::Executed
        });
        let p = pending.clone();
        main.add_with("admin", "enter the admin mode", move |_| {
            *p.borrow_mut() = Some(Action::EnterAdmin);
            CommandResult::Executed
        });
        main.add_with("greet", "print a greeting (try --help)", greet);
        let v = vars.clone();
        main.add_with("vars", "show all shell variables", move |name| {
            let v = v.borrow();
            if name.is_empty() {
                println!("(assign with name=value, expand with $name)");
            } else {
                println!("{name}={}", v.get(name).unwrap_or(""));
            }
            CommandResult::Executed
        });
    }

    let admin = cli
        .mode_add("admin", "admin# ", color(PromptColor::BoldRed), None)?
        .unwrap();
    {
        let mut admin = admin.borrow_mut();
        let p = pending.clone();
        admin.add_with("help", "list available commands", move |_| {
            *p.borrow_mut() = Some(Action::Help);
            CommandResult::Executed
        });
        let p = pending.clone();
        admin.add_with("exit", "leave the admin mode", move |_| {
            *p.borrow_mut() = Some(Action::LeaveAdmin);
            CommandResult::Executed
        });
        admin.add_with("status", "report shell status", |_| {
            println!("all quiet");
            CommandResult::Executed
        });
    }

    // both modes pick the longest unambiguous candidate, else keep the prefix
    for mode in [&main, &admin] {
        mode.borrow_mut().on_complete(|prefix, matches| {
            if matches.len() == 1 {
                matches[0].clone()
            } else {
                prefix.to_string()
            }
        });
    }

    cli.mode_push("repline");
    let v = vars.clone();
    cli.add_preprocessor(move |line: &str| -> Result<repline::Rewritten> {
        v.borrow_mut().rewrite(line)
    });
    Ok(cli)
}

fn main() -> Result<()> {
    env_logger::init();
    let args: DemoArgs = argh::from_env();

    let pending: Rc<RefCell<Option<Action>>> = Rc::new(RefCell::new(None));
    let vars = Rc::new(RefCell::new(VarEngine::new()));
    vars.borrow_mut().set("shell", "repline");

    let mut cli = build_cli(&args, &pending, &vars)?;

    while let Some(line) = cli.read_line() {
        match cli.process(&line) {
            CommandResult::Executed => {
                cli.append_to_history(&line);
            }
            CommandResult::Nop => {}
            CommandResult::NoCommand(_) => {
                eprintln!("{}", cli.last_error());
            }
        }
        let action = pending.borrow_mut().take();
        match action {
            Some(Action::Quit) => break,
            Some(Action::Help) => {
                if let Some(mode) = cli.current_mode() {
                    print!("{}", mode.borrow().help(2));
                }
            }
            Some(Action::EnterAdmin) => {
                cli.mode_push("admin");
            }
            Some(Action::LeaveAdmin) => {
                cli.mode_pop();
            }
            None => {}
        }
    }
    Ok(())
}
