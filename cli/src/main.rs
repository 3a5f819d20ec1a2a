use std::env;
use std::io;
use std::io::Write;
use std::process;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use linkgram::dictionary::Dictionary;
use linkgram::options::ParseOptions;
use linkgram::postprocess::RuleSet;
use linkgram::sentence::Sentence;
use linkgram::Err;

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} DICT [options]

Options:
  -h, --help          Print this message
  -r, --rules FILE    Post-processing rules to check linkages against
  -c, --constituents  Print a constituent tree for each linkage

Commands at the prompt:
  !name=value         Set a parse option, as in !max_null_count=3
  !union              Toggle printing the union of conjunction sublinkages
  !options            Print the current options",
    prog_name
  )
}

struct Settings {
  opts: ParseOptions,
  print_constituents: bool,
  print_union: bool,
}

fn parse(dict: &Dictionary, sentence: &str, settings: &mut Settings) -> Result<(), Err> {
  let mut sentence = Sentence::new(sentence, dict)?;
  settings.opts.reset_resources();
  let count = sentence.parse(&mut settings.opts)?;

  println!(
    "Found {} linkage{} ({} valid, {} null{})",
    sentence.num_linkages_found()?,
    if sentence.num_linkages_found()? == 1 { "" } else { "s" },
    count,
    sentence.null_count()?,
    if sentence.null_count()? == 1 { "" } else { "s" },
  );
  if settings.opts.timer_expired() {
    println!("Timer expired, the results may be incomplete");
  }
  if settings.opts.memory_exhausted() {
    println!("Memory exhausted, the results may be incomplete");
  }

  for idx in 0..count {
    let linkage = sentence.linkage_mut(idx)?;
    if settings.print_union {
      linkage.compute_union();
    }

    for sub in 0..linkage.num_sublinkages() {
      linkage.set_current_sublinkage(sub)?;
      println!("{}", linkage);
      if settings.print_constituents {
        println!("{}", linkage.constituent_tree());
      }
      println!();
    }
  }

  Ok(())
}

/// `!name=value` and friends. Returns false if the line was not a command.
fn command(line: &str, settings: &mut Settings) -> bool {
  let Some(cmd) = line.strip_prefix('!') else {
    return false;
  };

  if cmd == "union" {
    settings.print_union = !settings.print_union;
    println!("union: {}", settings.print_union);
  } else if cmd == "options" {
    println!("{:#?}", settings.opts);
  } else if let Some((name, value)) = cmd.split_once('=') {
    match settings.opts.set(name, value) {
      Ok(()) => println!("{} = {}", name.trim(), value.trim()),
      Err(e) => eprintln!("{}", e),
    }
  } else {
    eprintln!("unknown command: {}", cmd);
  }
  true
}

struct Args {
  filename: String,
  rules: Option<String>,
  print_constituents: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "linkgram"));
    };

    let mut filename: Option<String> = None;
    let mut rules: Option<String> = None;
    let mut print_constituents = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-c" || o == "--constituents" {
        print_constituents = true;
      } else if o == "-r" || o == "--rules" {
        match iter.next() {
          Some(path) => rules = Some(path),
          None => return Err(Self::make_error_message("missing rules file", prog_name)),
        }
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if let Some(filename) = filename {
      Ok(Self {
        filename,
        rules,
        print_constituents,
      })
    } else {
      Err(Self::make_error_message("missing dictionary", prog_name))
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let args = match Args::parse(env::args().collect()) {
    Ok(args) => args,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let mut dict = Dictionary::read_from_file(&args.filename)?;
  if let Some(rules) = &args.rules {
    let rules = RuleSet::read_from_file(rules)?;
    if rules.is_empty() {
      warn!("rule file has no domains or rules");
    }
    dict = dict.with_post_processor(rules);
  }

  let mut settings = Settings {
    opts: ParseOptions::default(),
    print_constituents: args.print_constituents,
    print_union: false,
  };

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        let line = input.trim();
        if !line.is_empty() && !command(line, &mut settings) {
          if let Err(e) = parse(&dict, line, &mut settings) {
            eprintln!("error: {}", e);
          }
        }
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
