//! `liha` command-line front end.
//!
//! # Responsibility
//! - Parse commands and resolve settings (flags over `LIHA_*` variables).
//! - Open the store, then call only the core facade services.
//! - Print reads as JSON and writes as bare ids/versions.
//!
//! # Usage
//!
//! ```bash
//! liha type create Task --base task
//! liha prop add <type-id> due --kind date --default 2024-01-01T00:00:00Z
//! liha object create <type-id> "Write report"
//! liha object set <object-id> <property-type-id> true
//! liha object recent <type-id>
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liha_core::{
    init_logging_from_config, open_db, BaseObjectType, CoreConfig, Object, ObjectService,
    ObjectType, ObjectTypeFilter, ObjectTypeService, PropertyKind, PropertyType,
    SqliteObjectRepository, SqliteSchemaRepository, Visibility,
};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "liha")]
#[command(about = "liha - user-definable object store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, global = true, env = "LIHA_DB_PATH")]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LIHA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true, env = "LIHA_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage and print the core version
    Ping,

    /// Object type management
    #[command(subcommand)]
    Type(TypeCommands),

    /// Property type management
    #[command(subcommand)]
    Prop(PropCommands),

    /// Object management
    #[command(subcommand)]
    Object(ObjectCommands),
}

#[derive(Subcommand)]
enum TypeCommands {
    /// Register a new object type
    Create {
        name: String,
        #[arg(long, value_parser = parse_base)]
        base: BaseObjectType,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long)]
        fixed: bool,
    },
    /// List object type ids in registration order
    List {
        #[arg(long, value_parser = parse_base)]
        base: Option<BaseObjectType>,
        #[arg(long)]
        fixed: Option<bool>,
    },
    /// Show one object type with its property types
    Show { id: Uuid },
    /// Change presentation fields of an object type
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        fixed: Option<bool>,
    },
    /// Delete an object type (fails while objects of it exist)
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum PropCommands {
    /// Add a property type to an object type
    Add {
        object_type_id: Uuid,
        name: String,
        /// text, number, boolean, date, or a target object type id
        #[arg(long, value_parser = PropertyKind::parse)]
        kind: PropertyKind,
        #[arg(long, default_value = "")]
        default: String,
        #[arg(long, value_parser = parse_visibility, default_value = "visible")]
        visibility: Visibility,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long)]
        ai_automated: bool,
    },
    /// List the property types of an object type
    List { object_type_id: Uuid },
    /// Delete a property type and its values
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum ObjectCommands {
    /// Create an object with default property values
    Create {
        object_type_id: Uuid,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        pinned: bool,
    },
    /// Show one object
    Show { id: Uuid },
    /// List all object ids in creation order
    List,
    /// List the most recently modified objects of a type
    Recent { object_type_id: Uuid },
    /// Set one property from its string form
    Set {
        object_id: Uuid,
        property_type_id: Uuid,
        value: String,
    },
    /// Append a text block to the object page
    AddContent { object_id: Uuid, text: String },
    /// Delete an object and its property values
    Delete { id: Uuid },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Commands::Ping = cli.command {
        println!("liha_core ping={}", liha_core::ping());
        println!("liha_core version={}", liha_core::core_version());
        return Ok(());
    }

    let config = resolve_config(&cli);
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: file logging disabled: {err}");
    }
    let conn = open_store(&config)?;

    match cli.command {
        Commands::Ping => Ok(()),
        Commands::Type(command) => run_type(&conn, command),
        Commands::Prop(command) => run_prop(&conn, command),
        Commands::Object(command) => run_object(&conn, command),
    }
}

fn resolve_config(cli: &Cli) -> CoreConfig {
    let mut config = CoreConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = log_dir.clone();
    }
    config
}

fn open_store(config: &CoreConfig) -> Result<Connection> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory `{}`", parent.display()))?;
    }
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    info!(
        "event=cli_open module=cli status=ok db_path={}",
        config.db_path.display()
    );
    Ok(conn)
}

fn type_service(conn: &Connection) -> Result<ObjectTypeService<SqliteSchemaRepository<'_>>> {
    Ok(ObjectTypeService::new(SqliteSchemaRepository::try_new(conn)?))
}

fn object_service(
    conn: &Connection,
) -> Result<ObjectService<SqliteSchemaRepository<'_>, SqliteObjectRepository<'_>>> {
    Ok(ObjectService::new(
        SqliteSchemaRepository::try_new(conn)?,
        SqliteObjectRepository::try_new(conn)?,
    ))
}

fn run_type(conn: &Connection, command: TypeCommands) -> Result<()> {
    let service = type_service(conn)?;
    match command {
        TypeCommands::Create {
            name,
            base,
            description,
            color,
            icon,
            fixed,
        } => {
            let mut object_type = ObjectType::new(name, base);
            object_type.description = description;
            object_type.color = color;
            object_type.icon = icon;
            object_type.fixed = fixed;
            println!("{}", service.create_object_type(&object_type)?);
        }
        TypeCommands::List { base, fixed } => {
            let filter = ObjectTypeFilter {
                base_object_type: base,
                fixed,
            };
            print_json(&service.list_object_type_ids(&filter)?)?;
        }
        TypeCommands::Show { id } => print_json(&service.get_object_type(id)?)?,
        TypeCommands::Update {
            id,
            name,
            description,
            color,
            icon,
            fixed,
        } => {
            let mut object_type = service.get_object_type(id)?;
            if let Some(name) = name {
                object_type.name = name;
            }
            if let Some(description) = description {
                object_type.description = description;
            }
            if let Some(color) = color {
                object_type.color = color;
            }
            if let Some(icon) = icon {
                object_type.icon = icon;
            }
            if let Some(fixed) = fixed {
                object_type.fixed = fixed;
            }
            service.update_object_type(&object_type)?;
            println!("{id}");
        }
        TypeCommands::Delete { id } => {
            service
                .delete_object_type(id)
                .with_context(|| format!("failed to delete object type {id}"))?;
            println!("{id}");
        }
    }
    Ok(())
}

fn run_prop(conn: &Connection, command: PropCommands) -> Result<()> {
    let service = type_service(conn)?;
    match command {
        PropCommands::Add {
            object_type_id,
            name,
            kind,
            default,
            visibility,
            icon,
            ai_automated,
        } => {
            let mut property_type = PropertyType::new(object_type_id, kind, name, default);
            property_type.visibility = visibility;
            property_type.icon = icon;
            property_type.ai_automated = ai_automated;
            println!(
                "{}",
                service.add_property_type(object_type_id, &property_type)?
            );
        }
        PropCommands::List { object_type_id } => {
            print_json(&service.list_property_types_of(object_type_id)?)?;
        }
        PropCommands::Delete { id } => {
            service.delete_property_type(id)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn run_object(conn: &Connection, command: ObjectCommands) -> Result<()> {
    let service = object_service(conn)?;
    match command {
        ObjectCommands::Create {
            object_type_id,
            title,
            description,
            pinned,
        } => {
            let mut object = Object::new(object_type_id, title);
            object.description = description;
            object.pinned = pinned;
            println!("{}", service.create_object(&object)?);
        }
        ObjectCommands::Show { id } => print_json(&service.get_object(id)?)?,
        ObjectCommands::List => print_json(&service.get_all_object_ids()?)?,
        ObjectCommands::Recent { object_type_id } => {
            print_json(&service.get_recent_objects_of_type(object_type_id)?)?;
        }
        ObjectCommands::Set {
            object_id,
            property_type_id,
            value,
        } => {
            let version = service
                .set_property_value(object_id, property_type_id, &value)
                .with_context(|| {
                    format!("failed to set property {property_type_id} on object {object_id}")
                })?;
            println!("{version}");
        }
        ObjectCommands::AddContent { object_id, text } => {
            println!("{}", service.add_new_content_to_object(object_id, &text)?);
        }
        ObjectCommands::Delete { id } => {
            service.delete_object(id)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_base(value: &str) -> Result<BaseObjectType, String> {
    BaseObjectType::parse(value).ok_or_else(|| {
        let known: Vec<&str> = BaseObjectType::ALL.iter().map(|base| base.as_str()).collect();
        format!("unknown base type `{value}`; expected one of {}", known.join("|"))
    })
}

fn parse_visibility(value: &str) -> Result<Visibility, String> {
    Visibility::parse(value)
        .ok_or_else(|| format!("unknown visibility `{value}`; expected visible|hidden|hidden_empty"))
}
