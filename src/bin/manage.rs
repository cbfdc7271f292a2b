// src/bin/manage.rs

//! Comandos administrativos: dados de exemplo, superusuário inicial e
//! conferência das variáveis de ambiente.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::{collections::HashMap, env, process::ExitCode, str::FromStr};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use catalog::{
    config::{env_check, AppState},
    models::{
        auth::User,
        category::CreateCategoryPayload,
        product::CreateProductPayload,
        profile::UpdateProfilePayload,
        tag::CreateTagPayload,
    },
    services::auth::AccountDraft,
};

#[derive(Debug, Parser)]
#[command(name = "manage", version, about = "Administração do catálogo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Popula o banco com usuários, categorias, tags e produtos de exemplo
    SeedDatabase {
        /// Apaga produtos, tags, categorias e contas comuns antes
        #[arg(long)]
        clear: bool,
    },
    /// Cria o superusuário inicial se ainda não existir nenhum
    CreateSuperuser {
        #[arg(long, default_value = "admin")]
        username: String,
        #[arg(long, default_value = "admin@example.com")]
        email: String,
        #[arg(long, default_value = "admin")]
        password: String,
    },
    /// Confere as variáveis de ambiente
    ValidateEnv {
        /// Avisos também reprovam
        #[arg(long)]
        strict: bool,
        /// Sai com código 1 se a conferência reprovar
        #[arg(long)]
        exit_on_error: bool,
    },
}

const SEED_PASSWORD: &str = "password123";

struct SeedUser {
    username: &'static str,
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    bio: &'static str,
    city: &'static str,
}

const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        username: "alice",
        email: "alice@example.com",
        first_name: "Alice",
        last_name: "Silva",
        bio: "Full-stack developer passionate about Rust and React.",
        city: "São Paulo",
    },
    SeedUser {
        username: "bob",
        email: "bob@example.com",
        first_name: "Bob",
        last_name: "Santos",
        bio: "Backend engineer specializing in Python and microservices.",
        city: "Rio de Janeiro",
    },
    SeedUser {
        username: "carol",
        email: "carol@example.com",
        first_name: "Carol",
        last_name: "Oliveira",
        bio: "Product manager with a passion for user experience.",
        city: "Belo Horizonte",
    },
];

// (nome, pai, descrição); pais vêm antes dos filhos
const SEED_CATEGORIES: &[(&str, Option<&str>, &str)] = &[
    ("Electronics", None, "Electronic devices and gadgets"),
    ("Computers", Some("Electronics"), "Desktop and laptop computers"),
    ("Smartphones", Some("Electronics"), "Mobile phones and tablets"),
    ("Clothing", None, "Apparel and fashion items"),
    ("Men's Clothing", Some("Clothing"), "Clothing for men"),
    ("Women's Clothing", Some("Clothing"), "Clothing for women"),
    ("Home & Garden", None, "Home improvement and garden supplies"),
    ("Books", None, "Physical and digital books"),
];

const SEED_TAGS: &[(&str, &str)] = &[
    ("New", "#28a745"),
    ("Popular", "#007bff"),
    ("Sale", "#dc3545"),
    ("Featured", "#ffc107"),
    ("Limited Edition", "#6f42c1"),
    ("Bestseller", "#17a2b8"),
    ("Eco-Friendly", "#20c997"),
];

struct SeedProduct {
    name: &'static str,
    price: &'static str,
    stock: i32,
    category: &'static str,
    tags: &'static [&'static str],
    // índice em SEED_USERS
    owner: usize,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct { name: "MacBook Pro 16\"", price: "2499.99", stock: 15, category: "Computers", tags: &["New", "Popular"], owner: 0 },
    SeedProduct { name: "iPhone 15 Pro", price: "999.99", stock: 40, category: "Smartphones", tags: &["New", "Bestseller"], owner: 0 },
    SeedProduct { name: "Samsung Galaxy S24 Ultra", price: "1199.99", stock: 25, category: "Smartphones", tags: &["New", "Popular"], owner: 1 },
    SeedProduct { name: "Dell XPS 15", price: "1799.99", stock: 12, category: "Computers", tags: &["Popular", "Featured"], owner: 1 },
    SeedProduct { name: "Sony WH-1000XM5", price: "399.99", stock: 60, category: "Electronics", tags: &["Popular", "Bestseller"], owner: 2 },
    SeedProduct { name: "Clean Code Book", price: "42.99", stock: 100, category: "Books", tags: &["Bestseller"], owner: 0 },
    SeedProduct { name: "The Pragmatic Programmer", price: "45.99", stock: 80, category: "Books", tags: &["Bestseller"], owner: 1 },
    SeedProduct { name: "iPad Pro 12.9\"", price: "1099.99", stock: 30, category: "Smartphones", tags: &["Popular", "Featured"], owner: 2 },
    SeedProduct { name: "Logitech MX Master 3S", price: "99.99", stock: 150, category: "Electronics", tags: &["Popular"], owner: 0 },
    SeedProduct { name: "LG UltraWide Monitor 34\"", price: "599.99", stock: 20, category: "Electronics", tags: &["Featured"], owner: 1 },
];

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::SeedDatabase { clear } => {
            let app_state = connect().await?;
            seed_database(&app_state, clear).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::CreateSuperuser {
            username,
            email,
            password,
        } => {
            let app_state = connect().await?;
            match app_state
                .auth_service
                .create_superuser(&username, &email, &password)
                .await
                .context("Falha ao criar o superusuário")?
            {
                Some(user) => println!("Superusuário '{}' criado.", user.username),
                None => println!("Já existe um superusuário; nada a fazer."),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ValidateEnv {
            strict,
            exit_on_error,
        } => Ok(validate_env(strict, exit_on_error)),
    }
}

async fn connect() -> anyhow::Result<AppState> {
    let app_state = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação")?;
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    Ok(app_state)
}

async fn seed_database(app_state: &AppState, clear: bool) -> anyhow::Result<()> {
    if clear {
        println!("Limpando dados existentes...");
        let products = app_state.product_service.purge_all().await?;
        let tags = app_state.tag_service.purge_all().await?;
        let categories = app_state.category_service.purge_all().await?;
        let users = app_state.auth_service.purge_regular_users().await?;
        println!(
            "Removidos: {products} produtos, {tags} tags, {categories} categorias, {users} usuários"
        );
    }

    println!("Populando banco de dados...");
    let users = seed_users(app_state).await?;
    let categories = seed_categories(app_state).await?;
    let tags = seed_tags(app_state).await?;
    let products = seed_products(app_state, &users, &categories, &tags).await?;

    println!(
        "\nBanco populado com sucesso!\n- {} usuários\n- {} categorias\n- {} tags\n- {} produtos",
        users.len(),
        categories.len(),
        tags.len(),
        products
    );
    Ok(())
}

async fn seed_users(app_state: &AppState) -> anyhow::Result<Vec<User>> {
    let mut users = Vec::with_capacity(SEED_USERS.len());
    for seed in SEED_USERS {
        let user = match app_state.auth_service.find_by_username(seed.username).await? {
            Some(user) => user,
            None => {
                let user = app_state
                    .auth_service
                    .create_account(AccountDraft {
                        username: seed.username.to_string(),
                        email: seed.email.to_string(),
                        password: SEED_PASSWORD.to_string(),
                        first_name: seed.first_name.to_string(),
                        last_name: seed.last_name.to_string(),
                        ..Default::default()
                    })
                    .await
                    .with_context(|| format!("Falha ao criar o usuário {}", seed.username))?;
                println!("  Usuário criado: {}", user.username);
                user
            }
        };

        let profile = UpdateProfilePayload {
            bio: Some(seed.bio.to_string()),
            city: Some(seed.city.to_string()),
            country: Some("Brazil".to_string()),
            ..Default::default()
        };
        app_state.profile_service.update_own(&user, &profile).await?;
        users.push(user);
    }
    Ok(users)
}

async fn seed_categories(app_state: &AppState) -> anyhow::Result<HashMap<&'static str, Uuid>> {
    let mut ids = HashMap::new();
    for &(name, parent, description) in SEED_CATEGORIES {
        let id = match app_state.category_service.find_by_name(name).await? {
            Some(existing) => existing.id,
            None => {
                let payload = CreateCategoryPayload {
                    name: name.to_string(),
                    description: description.to_string(),
                    parent_id: parent.and_then(|p| ids.get(p).copied()),
                };
                let created = app_state
                    .category_service
                    .create(payload, None)
                    .await
                    .with_context(|| format!("Falha ao criar a categoria {name}"))?;
                println!("  Categoria criada: {name}");
                created.category.id
            }
        };
        ids.insert(name, id);
    }
    Ok(ids)
}

async fn seed_tags(app_state: &AppState) -> anyhow::Result<HashMap<&'static str, Uuid>> {
    let mut ids = HashMap::new();
    for &(name, color) in SEED_TAGS {
        let id = match app_state.tag_service.find_by_name(name).await? {
            Some(existing) => existing.id,
            None => {
                let payload = CreateTagPayload {
                    name: name.to_string(),
                    color: color.to_string(),
                };
                let created = app_state
                    .tag_service
                    .create(payload, None)
                    .await
                    .with_context(|| format!("Falha ao criar a tag {name}"))?;
                println!("  Tag criada: {name}");
                created.tag.id
            }
        };
        ids.insert(name, id);
    }
    Ok(ids)
}

async fn seed_products(
    app_state: &AppState,
    users: &[User],
    categories: &HashMap<&'static str, Uuid>,
    tags: &HashMap<&'static str, Uuid>,
) -> anyhow::Result<usize> {
    let mut count = 0;
    for seed in SEED_PRODUCTS {
        count += 1;
        if app_state.product_service.find_by_name(seed.name).await?.is_some() {
            continue;
        }
        let payload = CreateProductPayload {
            name: seed.name.to_string(),
            price: Decimal::from_str(seed.price)?,
            stock: seed.stock,
            category_id: categories.get(seed.category).copied(),
            tag_ids: seed.tags.iter().filter_map(|t| tags.get(t).copied()).collect(),
        };
        let owner = users.get(seed.owner).map(|u| u.id);
        app_state
            .product_service
            .create(payload, owner)
            .await
            .with_context(|| format!("Falha ao criar o produto {}", seed.name))?;
        println!("  Produto criado: {}", seed.name);
    }
    Ok(count)
}

fn validate_env(strict: bool, exit_on_error: bool) -> ExitCode {
    // .env é opcional aqui
    dotenvy::dotenv().ok();
    let report = env_check::validate(|key| env::var(key).ok());

    println!(
        "Conferindo variáveis de ambiente ({})",
        if report.production { "produção" } else { "desenvolvimento" }
    );
    for checked in &report.checked {
        println!("  ✓ {} = {}", checked.var, checked.shown);
    }

    let errors = report.errors();
    let warnings = report.warnings();
    if !warnings.is_empty() {
        println!("\nAvisos:");
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }
    if !errors.is_empty() {
        println!("\nErros:");
        for error in &errors {
            println!("  ✗ {error}");
        }
    }

    if report.passed(strict) {
        println!("\nConferência aprovada.");
        ExitCode::SUCCESS
    } else {
        println!("\nConferência reprovada.");
        if exit_on_error {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}
