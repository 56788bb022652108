use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings_from, load_settings, sort, Acknowledgment, BookApi, BookListView,
    CartMutationFlow, CartView, ClientError, ClientSettings, Confirmer, DeleteDialog, DetailPhase,
    DetailRefreshController, DetailView, DialogOutcome, HttpBookstoreClient, ListParams,
    ListQueryPipeline, MutationAction, RefreshBus, Route, UiShell,
};
use shared::domain::{BookId, ReviewId};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "Browse and shop the bookstore from the terminal")]
struct Args {
    /// Backend base URL; overrides storefront.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Bearer token sent with every request.
    #[arg(long, global = true)]
    token: Option<String>,
    /// Settings file to read instead of ./storefront.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print records as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the catalog, optionally searching and sorting.
    Books {
        #[arg(long)]
        search: Option<String>,
        /// `field,asc` or `field,desc`.
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one book with its reviews.
    Book { id: i64 },
    AddToCart {
        id: i64,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
    },
    Review {
        id: i64,
        #[arg(long)]
        rating: Option<i32>,
        #[arg(long)]
        comment: Option<String>,
    },
    DeleteReview {
        book_id: i64,
        review_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    Cart,
    PlaceOrder,
}

struct ConsoleShell;

impl UiShell for ConsoleShell {
    fn navigate(&self, route: Route) {
        info!(?route, "navigate");
    }

    fn acknowledge(&self, ack: Acknowledgment) {
        match ack {
            Acknowledgment::Success(text) => println!("{text}"),
            Acknowledgment::Failure(text) => eprintln!("{text}"),
        }
    }
}

struct StdinConfirmer {
    assume_yes: bool,
}

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

struct App {
    settings: ClientSettings,
    client: Arc<HttpBookstoreClient>,
    shell: Arc<ConsoleShell>,
    bus: RefreshBus,
    json: bool,
}

impl App {
    fn dialog(&self, assume_yes: bool) -> Arc<DeleteDialog> {
        Arc::new(DeleteDialog::new(
            self.client.clone(),
            self.client.clone(),
            Arc::new(StdinConfirmer { assume_yes }),
            self.shell.clone(),
        ))
    }

    fn mutations(&self) -> Arc<CartMutationFlow> {
        Arc::new(CartMutationFlow::new(
            self.client.clone(),
            self.client.clone(),
            self.bus.clone(),
            self.shell.clone(),
        ))
    }

    fn detail(&self, assume_yes: bool) -> DetailRefreshController {
        DetailRefreshController::new(
            self.client.clone(),
            self.client.clone(),
            self.dialog(assume_yes),
            self.shell.clone(),
        )
    }

    async fn books(&self, search: Option<String>, sort: Option<String>) -> Result<()> {
        let default_sort = sort::decode(None, self.settings.default_sort.as_deref());
        let pipeline = Arc::new(ListQueryPipeline::new(self.client.clone(), default_sort));
        let view = BookListView::new(pipeline, self.dialog(false));
        view.resolve_admin(self.client.as_ref()).await;
        view.apply_params(&ListParams { search, sort });
        view.load().await?;

        let state = view.snapshot();
        debug!(params = ?view.to_params(), count = state.items.len(), "books loaded");
        if self.json {
            let records: Vec<_> = state.items.iter().map(|item| &item.record).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }
        for item in &state.items {
            let book = &item.record;
            let stars: String = item
                .stars()
                .iter()
                .map(|filled| if *filled { '*' } else { '.' })
                .collect();
            println!(
                "{:>5}  {:<40}  {:<24}  {:>8}  {:>4}  {stars} ({} reviews)",
                book.id,
                book.display_title(),
                book.author.as_deref().unwrap_or("-"),
                book.price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".into()),
                book.stock(),
                item.sub_items.len(),
            );
        }
        if state.items.is_empty() {
            println!("No books found.");
        }
        Ok(())
    }

    async fn book(&self, id: i64) -> Result<()> {
        let controller = self.detail(false);
        let view = load_detail(&controller, BookId(id)).await?;
        self.print_detail(&view)
    }

    fn print_detail(&self, view: &DetailView) -> Result<()> {
        let book = view
            .book
            .as_ref()
            .ok_or_else(|| anyhow!("book details unavailable"))?;
        if self.json {
            let reviews: Vec<_> = view.reviews.iter().map(|r| &r.review).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "book": book,
                    "reviews": reviews,
                }))?
            );
            return Ok(());
        }
        println!("#{} {}", book.id, book.display_title());
        if let Some(author) = &book.author {
            println!("by {author}");
        }
        if let Some(description) = &book.description {
            println!("{description}");
        }
        println!("in stock: {}", book.stock());
        for dated in &view.reviews {
            let when = dated
                .created_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "undated".into());
            println!(
                "  [{}] {}/5 {when}: {}",
                dated.review.id,
                dated.review.rating.unwrap_or(0),
                dated.review.comment.as_deref().unwrap_or("")
            );
        }
        Ok(())
    }

    async fn add_to_cart(&self, id: i64, quantity: i64) -> Result<()> {
        let book = self
            .client
            .find_book(BookId(id))
            .await?
            .ok_or_else(|| ClientError::not_found("book", id))?;
        self.mutations()
            .submit(MutationAction::add_to_cart(&book, quantity))
            .await?;
        Ok(())
    }

    async fn review(&self, id: i64, rating: Option<i32>, comment: Option<String>) -> Result<()> {
        let controller = self.detail(false);
        load_detail(&controller, BookId(id)).await?;
        let _subscription = controller.attach(&self.bus);
        let mut views = WatchStream::from_changes(controller.subscribe());

        self.mutations()
            .submit(MutationAction::SubmitReview {
                book_id: BookId(id),
                rating,
                comment,
            })
            .await?;

        let settled = tokio::time::timeout(self.settings.request_timeout(), async {
            while let Some(view) = views.next().await {
                if view.phase != DetailPhase::Loading {
                    return Some(view);
                }
            }
            None
        })
        .await
        .ok()
        .flatten();
        match settled {
            Some(view) => self.print_detail(&view),
            None => Ok(()),
        }
    }

    async fn delete_review(&self, book_id: i64, review_id: i64, assume_yes: bool) -> Result<()> {
        let controller = self.detail(assume_yes);
        let view = load_detail(&controller, BookId(book_id)).await?;
        let review = view
            .reviews
            .iter()
            .find(|r| r.review.id == ReviewId(review_id))
            .map(|r| r.review.clone())
            .ok_or_else(|| anyhow!("review {review_id} not found on book {book_id}"))?;

        match controller.delete_review(review).await {
            DialogOutcome::Deleted => {
                println!("Review {review_id} deleted.");
                self.print_detail(&controller.view())
            }
            DialogOutcome::Dismissed => {
                println!("Nothing deleted.");
                Ok(())
            }
            DialogOutcome::Failed => bail!("review {review_id} was not deleted"),
        }
    }

    async fn cart(&self, order: bool) -> Result<()> {
        let mut view = CartView::new(
            self.client.clone(),
            self.client.clone(),
            self.mutations(),
            self.shell.clone(),
        );
        view.load().await?;
        if view.snapshot().is_admin {
            println!("Administrators do not have a shopping cart.");
            return Ok(());
        }
        if order {
            view.place_order().await?;
            println!("Order placed.");
            return Ok(());
        }

        let snapshot = view.snapshot();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot.cart)?);
            return Ok(());
        }
        let Some(cart) = snapshot.cart.as_ref().filter(|c| !c.is_empty()) else {
            println!("Your cart is empty.");
            return Ok(());
        };
        for item in cart.items() {
            let title = item
                .book
                .as_ref()
                .map(|b| b.display_title().to_string())
                .unwrap_or_else(|| "unknown book".into());
            println!(
                "{:>3} x {:<40} {:>10.2}",
                item.quantity.unwrap_or(0),
                title,
                item.line_total()
            );
        }
        println!("total: {:.2}", snapshot.total_price());
        Ok(())
    }
}

/// Binds the controller and waits for a terminal phase.
async fn load_detail(controller: &DetailRefreshController, id: BookId) -> Result<DetailView> {
    controller.bind(Some(id)).await;
    let view = controller.view();
    match view.phase {
        DetailPhase::Loaded => Ok(view),
        DetailPhase::NotFound => Err(ClientError::not_found("book", id).into()),
        _ => Err(anyhow!(view
            .last_error
            .unwrap_or_else(|| "could not load book details".into()))),
    }
}

fn settings_for(args: &Args) -> Result<ClientSettings> {
    let mut settings = match &args.config {
        Some(path) => load_settings_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => load_settings(),
    };
    if let Some(url) = &args.api_url {
        settings.api_base_url = url.clone();
    }
    if let Some(token) = &args.token {
        settings.api_token = Some(token.clone());
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();

    let settings = settings_for(&args)?;
    let client = Arc::new(HttpBookstoreClient::new(&settings)?);
    info!(api = client.base_url(), "storefront starting");
    let app = App {
        settings,
        client,
        shell: Arc::new(ConsoleShell),
        bus: RefreshBus::new(),
        json: args.json,
    };

    match args.command {
        Command::Books { search, sort } => app.books(search, sort).await,
        Command::Book { id } => app.book(id).await,
        Command::AddToCart { id, quantity } => app.add_to_cart(id, quantity).await,
        Command::Review {
            id,
            rating,
            comment,
        } => app.review(id, rating, comment).await,
        Command::DeleteReview {
            book_id,
            review_id,
            yes,
        } => app.delete_review(book_id, review_id, yes).await,
        Command::Cart => app.cart(false).await,
        Command::PlaceOrder => app.cart(true).await,
    }
}
