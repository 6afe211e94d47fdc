use clap::Parser;
use refract::{Operation, ToInput};
use std::io::Read;
use std::process::ExitCode;

/// validate – check one request against the portfolio model
///
/// Prints the canonical form of the arguments, or every violation
/// found as a JSON array. Arguments are read from stdin when JSON
/// is omitted.
#[derive(Parser, Debug)]
#[command(version, about, arg_required_else_help(true))]
struct Args {
    /// Entity name, in any case (`blog`, `SkillCategory`)
    entity: String,

    /// Operation, such as `findMany` or `find_many`
    operation: Operation,

    /// Raw arguments as JSON
    json: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let source = match args.json {
        Some(json) => json,
        None => {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("failed to read stdin: {}", e);
                return ExitCode::from(2);
            }
            buf
        }
    };
    let raw: serde_json::Value = match serde_json::from_str(&source) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("invalid JSON: {}", e);
            return ExitCode::from(2);
        }
    };

    let schema = match portfolio::install() {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match schema.validate(args.operation, &args.entity, &raw) {
        Ok(validated) => {
            println!("{}", validated.to_input());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            match serde_json::to_string_pretty(&errors) {
                Ok(body) => println!("{}", body),
                Err(_) => println!("{}", errors),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_accepts_either_case() {
        let args = Args::try_parse_from(["validate", "blog", "find_many", "{}"]).unwrap();
        assert_eq!(args.entity, "blog");
        assert_eq!(args.operation, Operation::FindMany);
        assert_eq!(args.json.as_deref(), Some("{}"));

        let args = Args::try_parse_from(["validate", "Skill", "groupBy"]).unwrap();
        assert_eq!(args.operation, Operation::GroupBy);
        assert!(args.json.is_none());
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        assert!(Args::try_parse_from(["validate", "blog", "findSome"]).is_err());
    }
}
