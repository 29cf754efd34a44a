use std::{process, sync::Arc};

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{BackendError, Identity, MutationError, SiteSync, SyncError},
    config::{self, AddPostArgs, AiArgs, Command, ContactArgs},
    domain::{BlobError, BlobRef, BlogPost, ContactForm, DomainError, Timestamp, new_record_id},
    infra::{HttpConnector, error::InfraError, telemetry},
    presentation::views,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_error(&error);
        process::exit(1);
    }
}

fn report_error(error: &CliError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "command failed");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "command failed");
    });
}

async fn run() -> Result<(), CliError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let connector = HttpConnector::from_settings(&settings.backend)?;
    let identity = settings
        .backend
        .token
        .clone()
        .map_or_else(Identity::anonymous, Identity::bearer);
    let site = SiteSync::connect(Arc::new(connector), identity).await?;

    match cli_args.command {
        Command::Intro => {
            let intro = site.queries().introduction().await?;
            print_json(&json!({
                "name": intro.name,
                "title": intro.title,
                "bio": views::paragraphs(&intro.bio),
                "image": views::image_src(intro.profile_image.as_ref(), views::PROFILE_PLACEHOLDER),
            }))
        }
        Command::Achievements => {
            let achievements = site.queries().achievements().await;
            let rows = achievements
                .iter()
                .map(|achievement| {
                    Ok(json!({
                        "id": achievement.id,
                        "title": achievement.title,
                        "date": views::month_label(achievement.date)?,
                        "image": views::image_src(
                            achievement.image.as_ref(),
                            views::ACHIEVEMENT_PLACEHOLDER,
                        ),
                    }))
                })
                .collect::<Result<Vec<_>, DomainError>>()?;
            print_json(&rows)
        }
        Command::Posts => {
            let posts = site.queries().blog_posts().await;
            let rows = views::posts_newest_first(&posts)
                .into_iter()
                .map(|post| {
                    Ok(json!({
                        "id": post.id,
                        "title": post.title,
                        "date": views::date_label(post.publication_date)?,
                        "image": post.featured_image.as_ref().map(|image| image.direct_url()),
                    }))
                })
                .collect::<Result<Vec<_>, DomainError>>()?;
            print_json(&rows)
        }
        Command::Sections => {
            let sections = site.queries().content_sections().await;
            let order = match site.queries().cms_settings().await {
                Ok(settings) => settings.custom_section_order.clone(),
                Err(err) => {
                    info!(error = %err, "CMS settings unavailable; using backend order");
                    Vec::new()
                }
            };
            let rows: Vec<_> = views::order_sections(&sections, &order)
                .into_iter()
                .map(|section| {
                    json!({
                        "id": section.id,
                        "title": section.title,
                        "paragraphs": views::paragraphs(&section.content),
                    })
                })
                .collect();
            print_json(&rows)
        }
        Command::Messages => {
            if !site.queries().is_admin().await {
                return Err(SyncError::forbidden("getContactForms").into());
            }
            print_json(&*site.queries().contact_forms().await)
        }
        Command::Stats => print_json(&*site.queries().site_stats().await?),
        Command::Cms => print_json(&*site.queries().cms_settings().await?),
        Command::Ai(AiArgs { full }) => {
            if full {
                print_json(&site.queries().full_ai_settings().await?)
            } else {
                print_json(&site.queries().ai_settings().await?)
            }
        }
        Command::Whoami => {
            let role = site.queries().caller_role().await?;
            let capabilities = site.queries().capabilities().await;
            print_json(&json!({
                "role": role,
                "isAdmin": capabilities.is_admin,
            }))
        }
        Command::Contact(args) => submit_contact(&site, args).await,
        Command::AddPost(args) => add_post(&site, args).await,
    }
}

async fn submit_contact(site: &SiteSync, args: ContactArgs) -> Result<(), CliError> {
    let form = ContactForm::new(args.name, args.email, args.message);
    let id = form.id.clone();
    site.mutations().submit_contact_form(form).await?;
    print_json(&json!({ "submitted": id }))
}

async fn add_post(site: &SiteSync, args: AddPostArgs) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(&args.content_file)
        .await
        .map_err(InfraError::from)?;
    let publication_date = match args.date.as_deref() {
        Some(date) => Timestamp::parse_date(date)?,
        None => Timestamp::now(),
    };
    let featured_image = match args.image {
        Some(path) => Some(
            BlobRef::from_file(&path)
                .await?
                .with_upload_progress(|percent| eprintln!("upload {percent}%")),
        ),
        None => None,
    };

    let post = BlogPost {
        id: new_record_id(),
        title: args.title,
        content,
        publication_date,
        featured_image,
    };
    let id = post.id.clone();
    site.mutations().add_blog_post(post).await?;

    let stats = site.queries().site_stats().await?;
    print_json(&json!({
        "published": id,
        "totalBlogPosts": stats.total_blog_posts,
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
