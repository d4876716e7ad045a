use std::io::Write;

use ast_compress::driver::{compress_document, CompressorOptions};
use ast_compress::lifter::lift_must;
use ast_compress::node::{Branch, NodeRef};
use ast_compress::schema::registry;

#[derive(Default)]
struct Flags {
    tokens: bool,
    ast: bool,
    lifted: bool,
    type_sorted: bool,
    compress: bool,
    path: Option<String>,
}

fn parse_flags(args: &[String]) -> Flags {
    let mut flags = Flags::default();
    for arg in args {
        match arg.as_str() {
            "--tokens" => flags.tokens = true,
            "--no-tokens" => flags.tokens = false,
            "--ast" => flags.ast = true,
            "--no-ast" => flags.ast = false,
            "--lifted" => flags.lifted = true,
            "--no-lifted" => flags.lifted = false,
            "--type-sorted" => flags.type_sorted = true,
            "--no-type-sorted" => flags.type_sorted = false,
            "--compress" => flags.compress = true,
            "--no-compress" => flags.compress = false,
            other if !other.starts_with("--") => flags.path = Some(other.to_string()),
            other => log::error!("ignoring unrecognized flag {}", other),
        }
    }
    flags
}

fn dump_tokens(root: &NodeRef, options: &CompressorOptions) {
    let mut table = ast_compress::string_table::StringTable::new();
    collect_for_dump(root, &mut table, options);
    table.finalize();
    for (id, s) in table.entries().iter().enumerate() {
        println!("{}\t{}", id, s);
    }
}

fn collect_for_dump(node: &NodeRef, table: &mut ast_compress::string_table::StringTable, options: &CompressorOptions) {
    let n = node.borrow();
    for (_, value) in &n.fields {
        table.add_value_recursive(value);
    }
    if options.collect_identifiers && n.node_type.name == "Identifier" {
        if let Some(ast_compress::node::FieldValue::Str(name)) = n.field("name") {
            table.add_identifier(name);
        }
    }
    let children: Vec<NodeRef> = n
        .children
        .iter()
        .flat_map(|(_, b)| match b {
            Branch::Single(Some(c)) => vec![c.clone()],
            Branch::Single(None) => vec![],
            Branch::Array(cs) => cs.clone(),
        })
        .collect();
    drop(n);
    for child in children {
        collect_for_dump(&child, table, options);
    }
}

fn dump_lifted(node: &NodeRef, depth: usize) {
    let n = node.borrow();
    println!("{}{} ({:?})", "  ".repeat(depth), n.node_type.name, n.fields);
    let children: Vec<(&'static str, Branch)> = n.children.clone();
    drop(n);
    for (name, branch) in children {
        match branch {
            Branch::Single(Some(child)) => dump_lifted(&child, depth + 1),
            Branch::Single(None) => println!("{}{}: null", "  ".repeat(depth + 1), name),
            Branch::Array(items) => {
                println!("{}{}: [{}]", "  ".repeat(depth + 1), name, items.len());
                for item in items {
                    dump_lifted(&item, depth + 2);
                }
            }
        }
    }
}

fn dump_type_sorted() {
    let mut names: Vec<&'static str> = registry().types.iter().map(|t| t.name).collect();
    names.sort_unstable();
    for name in names {
        let ty = registry().lookup(name).unwrap();
        println!("{}\t{}\t{}", ty.code, ty.name, ty.alias);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let flags = parse_flags(&args);

    if !flags.tokens && !flags.ast && !flags.lifted && !flags.type_sorted && !flags.compress {
        return Err("no mode selected: pass one of --tokens --ast --lifted --type-sorted --compress".to_string());
    }

    if flags.type_sorted {
        dump_type_sorted();
    }

    let needs_file = flags.tokens || flags.ast || flags.lifted || flags.compress;
    if !needs_file {
        return Ok(());
    }

    let path = flags.path.as_ref().ok_or_else(|| "no input file given".to_string())?;
    let content = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path, e))?;
    let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| format!("parsing {}: {}", path, e))?;

    if flags.ast {
        println!("{:#?}", raw);
    }

    if flags.tokens || flags.lifted || flags.compress {
        let root = lift_must(&raw).map_err(|e| format!("lifting {}: {}", path, e))?;

        if flags.tokens {
            dump_tokens(&root, &CompressorOptions::default());
        }
        if flags.lifted {
            dump_lifted(&root, 0);
        }
        if flags.compress {
            let bytes = compress_document(&root, &CompressorOptions::default());
            std::io::stdout().write_all(&bytes).map_err(|e| format!("writing stdout: {}", e))?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
