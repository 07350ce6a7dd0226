//! Integration tests for the Bazaar storefront client.
//!
//! [`MockBackend`] serves the storefront REST API (`/api/v1`) from memory on
//! an ephemeral local port, so the real `reqwest` adapter, gateway, store and
//! orchestrator are exercised end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Knobs
//!
//! - [`CartShape`] / [`WishlistShape`] - which historical payload format the
//!   backend answers with
//! - [`MockBackend::fail_next`] - answer the next request with an error status
//! - [`MockBackend::set_mutation_delay`] - hold cart mutations open to observe
//!   overlapping requests
//! - [`MockBackend::revoke_sessions`] - invalidate every issued token

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use bazaar_client::{
    ApiClient, CartStorage, CatalogClient, ClientConfig, HttpError, LoginCredentials,
    MemoryCartStorage, RestGateway, Store, Storefront, SyncError,
};
use bazaar_core::UserRole;

pub const BUYER_ID: &str = "u-buyer";
pub const BUYER_EMAIL: &str = "ada@example.com";
pub const BUYER_PASSWORD: &str = "correct horse";
pub const SELLER_ID: &str = "u-seller";
pub const SELLER_EMAIL: &str = "grace@example.com";
pub const SELLER_PASSWORD: &str = "battery staple";

/// Cart payload format the backend answers with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartShape {
    /// `{ cart: { cartItems: [{ product: {...}, qty }] } }`
    #[default]
    Wrapped,
    /// `[{ productId, name, price, stock, qty }]`
    Flat,
    /// `{ items: [...] }` with every line listed twice
    Duplicated,
}

/// Wishlist mutation payload format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WishlistShape {
    /// `{ wishlist: { products: [...] } }`
    #[default]
    Full,
    /// Only the affected product id, as a bare string
    BareId,
}

#[derive(Debug, Clone)]
pub struct MockProduct {
    pub id: String,
    pub name: String,
    pub price: String,
    pub stock: u32,
}

impl MockProduct {
    fn new(id: &str, name: &str, price: &str, stock: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            stock,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "price": self.price,
            "stock": self.stock,
            "image": format!("/images/{}.png", self.id),
            "productType": "Home",
            "color": "White",
            "rating": 4.5,
            "seller": { "_id": SELLER_ID, "name": "Grace's Goods", "email": SELLER_EMAIL },
        })
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
}

impl Account {
    fn new(id: &str, name: &str, email: &str, password: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        }
    }

    fn to_json(&self) -> Value {
        json!({ "_id": self.id, "name": self.name, "email": self.email, "role": self.role })
    }
}

#[derive(Debug, Default)]
struct BackendState {
    products: Vec<MockProduct>,
    accounts: Vec<Account>,
    /// token -> user id
    sessions: HashMap<String, String>,
    /// user id -> (product id, qty), in insertion order
    carts: HashMap<String, Vec<(String, u32)>>,
    /// user id -> product ids; appended without deduplication
    wishlists: HashMap<String, Vec<String>>,
    /// product id -> review documents
    reviews: HashMap<String, Vec<Value>>,
    cart_shape: CartShape,
    wishlist_shape: WishlistShape,
    register_issues_token: bool,
    fail_next: Option<StatusCode>,
    mutation_delay: Option<Duration>,
    requests: Vec<String>,
    checkout_requests: Vec<Value>,
    in_flight: usize,
    max_in_flight: usize,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, BackendState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

impl BackendState {
    fn seeded() -> Self {
        Self {
            products: vec![
                MockProduct::new("p1", "Desk Lamp", "19.99", 5),
                MockProduct::new("p2", "Notebook", "4.50", 2),
                MockProduct::new("p3", "Headphones", "89.00", 1),
            ],
            accounts: vec![
                Account::new(BUYER_ID, "Ada", BUYER_EMAIL, BUYER_PASSWORD, "buyer"),
                Account::new(SELLER_ID, "Grace", SELLER_EMAIL, SELLER_PASSWORD, "seller"),
            ],
            reviews: HashMap::from([(
                "p1".to_string(),
                vec![
                    json!({ "name": "Ada", "rating": 5, "comment": "Bright and sturdy" }),
                    json!({ "user": { "name": "Linus" }, "rating": 3, "comment": "Wobbles" }),
                ],
            )]),
            ..Self::default()
        }
    }

    /// Record the request and consume an injected failure.
    fn enter(&mut self, route: &str) -> Result<(), Response> {
        self.requests.push(route.to_string());
        self.fail_next
            .take()
            .map_or(Ok(()), |status| Err(error(status, "Injected failure")))
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<String, Response> {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| self.sessions.get(token))
            .cloned()
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))
    }

    fn product(&self, id: &str) -> Result<&MockProduct, Response> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| error(StatusCode::NOT_FOUND, "Product not found"))
    }

    fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn cart_body(&self, user_id: &str) -> Value {
        let lines: Vec<(&MockProduct, u32)> = self
            .carts
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|(id, qty)| self.products.iter().find(|p| &p.id == id).map(|p| (p, *qty)))
            .collect();

        let flat = |(product, qty): &(&MockProduct, u32)| {
            json!({
                "productId": product.id,
                "name": product.name,
                "price": product.price,
                "stock": product.stock,
                "qty": qty,
            })
        };

        match self.cart_shape {
            CartShape::Wrapped => json!({
                "cart": {
                    "_id": format!("cart-{user_id}"),
                    "cartItems": lines
                        .iter()
                        .map(|(product, qty)| json!({ "product": product.to_json(), "qty": qty }))
                        .collect::<Vec<_>>(),
                }
            }),
            CartShape::Flat => Value::Array(lines.iter().map(flat).collect()),
            CartShape::Duplicated => json!({
                "items": lines.iter().chain(lines.iter()).map(flat).collect::<Vec<_>>(),
            }),
        }
    }

    fn wishlist_body(&self, user_id: &str) -> Value {
        let products: Vec<Value> = self
            .wishlists
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.products.iter().find(|p| &p.id == id))
            .map(MockProduct::to_json)
            .collect();
        json!({ "wishlist": { "user": user_id, "products": products } })
    }
}

fn product_and_qty(body: &Value) -> Result<(String, u32), Response> {
    let product_id = body
        .get("productId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "productId is required"))?
        .to_string();
    let qty = body
        .get("qty")
        .and_then(Value::as_u64)
        .map_or(Ok(1), u32::try_from)
        .map_err(|_| error(StatusCode::BAD_REQUEST, "qty is out of range"))?;
    Ok((product_id, qty))
}

fn set_line(cart: &mut Vec<(String, u32)>, product_id: &str, qty: u32) {
    if qty == 0 {
        cart.retain(|(id, _)| id != product_id);
    } else if let Some(line) = cart.iter_mut().find(|(id, _)| id == product_id) {
        line.1 = qty;
    } else {
        cart.push((product_id.to_string(), qty));
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Authenticate, optionally hold the request open, then apply a cart change
/// and answer with the whole cart.
async fn cart_mutation<F>(
    shared: Shared,
    route: &'static str,
    headers: &HeaderMap,
    body: &Value,
    apply: F,
) -> Response
where
    F: FnOnce(&mut BackendState, &str, &Value) -> Result<(), Response>,
{
    let (user_id, delay) = {
        let mut state = lock(&shared);
        if let Err(response) = state.enter(route) {
            return response;
        }
        let user_id = match state.authenticate(headers) {
            Ok(user_id) => user_id,
            Err(response) => return response,
        };
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        (user_id, state.mutation_delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = lock(&shared);
    state.in_flight -= 1;
    match apply(&mut state, &user_id, body) {
        Ok(()) => Json(state.cart_body(&user_id)).into_response(),
        Err(response) => response,
    }
}

async fn fetch_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /cart") {
        return response;
    }
    match state.authenticate(&headers) {
        Ok(user_id) => Json(state.cart_body(&user_id)).into_response(),
        Err(response) => response,
    }
}

async fn add_to_cart(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    cart_mutation(shared, "POST /cart/add", &headers, &body, |state, user_id, body| {
        let (product_id, qty) = product_and_qty(body)?;
        let stock = state.product(&product_id)?.stock;
        let cart = state.carts.entry(user_id.to_string()).or_default();
        let current = cart
            .iter()
            .find(|(id, _)| *id == product_id)
            .map_or(0, |(_, q)| *q);
        let wanted = current.saturating_add(qty);
        if wanted > stock {
            return Err(error(
                StatusCode::BAD_REQUEST,
                &format!("Only {stock} left in stock"),
            ));
        }
        set_line(cart, &product_id, wanted);
        Ok(())
    })
    .await
}

async fn remove_from_cart(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    cart_mutation(shared, "POST /cart/remove", &headers, &body, |state, user_id, body| {
        let (product_id, _) = product_and_qty(body)?;
        let cart = state.carts.entry(user_id.to_string()).or_default();
        if !cart.iter().any(|(id, _)| *id == product_id) {
            return Err(error(StatusCode::NOT_FOUND, "Item not in cart"));
        }
        set_line(cart, &product_id, 0);
        Ok(())
    })
    .await
}

async fn update_cart(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    cart_mutation(shared, "POST /cart/update", &headers, &body, |state, user_id, body| {
        let (product_id, qty) = product_and_qty(body)?;
        let stock = state.product(&product_id)?.stock;
        if qty > stock {
            return Err(error(
                StatusCode::BAD_REQUEST,
                &format!("Only {stock} left in stock"),
            ));
        }
        let cart = state.carts.entry(user_id.to_string()).or_default();
        if !cart.iter().any(|(id, _)| *id == product_id) {
            return Err(error(StatusCode::NOT_FOUND, "Item not in cart"));
        }
        set_line(cart, &product_id, qty);
        Ok(())
    })
    .await
}

async fn clear_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("POST /cart/clear") {
        return response;
    }
    match state.authenticate(&headers) {
        Ok(user_id) => {
            state.carts.remove(&user_id);
            Json(json!({ "message": "Cart cleared", "cart": null })).into_response()
        }
        Err(response) => response,
    }
}

async fn fetch_wishlist(
    State(shared): State<Shared>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /wishlist") {
        return response;
    }
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    Json(state.wishlist_body(&user_id)).into_response()
}

async fn add_to_wishlist(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wishlist_mutation(&shared, "POST /wishlist/add", &headers, &body, |list, product_id| {
        list.push(product_id.to_string());
    })
}

async fn remove_from_wishlist(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wishlist_mutation(&shared, "POST /wishlist/remove", &headers, &body, |list, product_id| {
        list.retain(|id| id != product_id);
    })
}

fn wishlist_mutation(
    shared: &Shared,
    route: &str,
    headers: &HeaderMap,
    body: &Value,
    apply: impl FnOnce(&mut Vec<String>, &str),
) -> Response {
    let mut state = lock(shared);
    if let Err(response) = state.enter(route) {
        return response;
    }
    let user_id = match state.authenticate(headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let (product_id, _) = match product_and_qty(body) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    if let Err(response) = state.product(&product_id) {
        return response;
    }

    apply(state.wishlists.entry(user_id.clone()).or_default(), &product_id);

    match state.wishlist_shape {
        WishlistShape::Full => Json(state.wishlist_body(&user_id)).into_response(),
        WishlistShape::BareId => Json(Value::String(product_id)).into_response(),
    }
}

async fn create_checkout_session(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("POST /payments/create-checkout-session") {
        return response;
    }
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    state.checkout_requests.push(body);
    let session = format!("cs_test_{}", state.checkout_requests.len());
    Json(json!({ "url": format!("https://checkout.example.test/pay/{session}") })).into_response()
}

async fn payment_session(State(shared): State<Shared>, Path(session_id): Path<String>) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /payments/session") {
        return response;
    }
    if !session_id.starts_with("cs_test_") {
        return error(StatusCode::NOT_FOUND, "No such checkout session");
    }
    Json(json!({
        "id": session_id,
        "payment_status": "paid",
        "customer_details": { "email": BUYER_EMAIL },
        "amount_total": 4448,
        "line_items": {
            "data": [
                { "description": "Desk Lamp", "quantity": 2, "amount_total": 3998 },
                { "description": "Notebook", "quantity": 1, "amount_total": 450 },
            ]
        }
    }))
    .into_response()
}

async fn login(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("POST /auth/login") {
        return response;
    }
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    let Some(account) = state
        .accounts
        .iter()
        .find(|a| a.email == email && a.password == password)
        .cloned()
    else {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };

    let token = format!("tok-{}", uuid::Uuid::new_v4());
    state.sessions.insert(token.clone(), account.id.clone());
    Json(json!({ "token": token, "user": account.to_json() })).into_response()
}

async fn register(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("POST /auth/register") {
        return response;
    }
    let field = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default();
    if field("email").is_empty() || field("password").is_empty() {
        return error(StatusCode::BAD_REQUEST, "Email and password are required");
    }
    if state.accounts.iter().any(|a| a.email == field("email")) {
        return error(StatusCode::BAD_REQUEST, "User already exists");
    }

    let role = match field("role") {
        "" => "buyer",
        role => role,
    };
    let account = Account::new(
        &format!("u-{}", uuid::Uuid::new_v4()),
        field("name"),
        field("email"),
        field("password"),
        role,
    );
    state.accounts.push(account.clone());

    if state.register_issues_token {
        let token = format!("tok-{}", uuid::Uuid::new_v4());
        state.sessions.insert(token.clone(), account.id.clone());
        return Json(json!({ "token": token, "user": account.to_json() })).into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": account.to_json() })),
    )
        .into_response()
}

async fn current_user(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /auth/getMe") {
        return response;
    }
    let user_id = match state.authenticate(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    match state.account(&user_id) {
        Some(account) => Json(json!({ "user": account.to_json() })).into_response(),
        None => error(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn logout(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("POST /auth/logout") {
        return response;
    }
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.sessions.remove(token);
    }
    Json(json!({ "message": "Logged out" })).into_response()
}

async fn list_products(State(shared): State<Shared>) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /products") {
        return response;
    }
    let products: Vec<Value> = state.products.iter().map(MockProduct::to_json).collect();
    Json(json!({ "products": products })).into_response()
}

async fn get_product(State(shared): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /products/:id") {
        return response;
    }
    match state.product(&id) {
        Ok(product) => Json(product.to_json()).into_response(),
        Err(response) => response,
    }
}

async fn seller_products(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /products/seller/getproduct") {
        return response;
    }
    let user_id = match state.authenticate(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    if state.account(&user_id).is_none_or(|a| a.role != "seller") {
        return error(StatusCode::FORBIDDEN, "Access denied");
    }
    // Every seeded product belongs to the seller account
    let products: Vec<Value> = state.products.iter().map(MockProduct::to_json).collect();
    Json(json!({ "products": products })).into_response()
}

async fn product_reviews(
    State(shared): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = lock(&shared);
    if let Err(response) = state.enter("GET /products/:id/reviews") {
        return response;
    }
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    if let Err(response) = state.product(&id) {
        return response;
    }
    let reviews = state.reviews.get(&id).cloned().unwrap_or_default();
    Json(json!({ "reviews": reviews })).into_response()
}

fn router(shared: Shared) -> Router {
    let api = Router::new()
        .route("/cart", get(fetch_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/remove", post(remove_from_cart))
        .route("/cart/update", post(update_cart))
        .route("/cart/clear", post(clear_cart))
        .route("/wishlist/add", post(add_to_wishlist))
        .route("/wishlist/remove", post(remove_from_wishlist))
        .route("/wishlist/{user_id}", get(fetch_wishlist))
        .route("/payments/create-checkout-session", post(create_checkout_session))
        .route("/payments/session/{session_id}", get(payment_session))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/getMe", get(current_user))
        .route("/auth/logout", post(logout))
        .route("/products", get(list_products))
        .route("/products/seller/getproduct", get(seller_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/reviews", get(product_reviews));

    Router::new().nest("/api/v1", api).with_state(shared)
}

// =============================================================================
// MockBackend
// =============================================================================

/// In-memory storefront backend bound to `127.0.0.1` on an ephemeral port.
///
/// The server task is aborted on drop.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend seeded with three products, a buyer and a seller.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state: Shared = Arc::new(Mutex::new(BackendState::seeded()));

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// `http://127.0.0.1:<port>/api/v1/`
    ///
    /// # Panics
    ///
    /// Never: a socket address always forms a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1/", self.addr)).expect("socket address is a valid URL")
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Never: the origin literal is a valid URL.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let origin = Url::parse("http://shop.example.test").expect("literal URL");
        let mut config = ClientConfig::new(self.base_url(), origin);
        config.timeout = Duration::from_secs(5);
        config
    }

    /// A signed-out storefront keeping its cart in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn storefront(&self) -> Result<Storefront<RestGateway>, HttpError> {
        self.storefront_with(&self.config(), Arc::new(MemoryCartStorage::new()))
    }

    /// A signed-out storefront over the given configuration and storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn storefront_with(
        &self,
        config: &ClientConfig,
        storage: Arc<dyn CartStorage>,
    ) -> Result<Storefront<RestGateway>, HttpError> {
        let api = ApiClient::new(config)?;
        Ok(Storefront::from_config(
            RestGateway::new(api),
            Store::restore(storage),
            config,
        ))
    }

    /// A storefront signed in as the buyer.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or login fails.
    pub async fn buyer(&self) -> Result<Storefront<RestGateway>, SyncError> {
        let storefront = self.storefront()?;
        storefront.login(&buyer_credentials()).await?;
        Ok(storefront)
    }

    /// A catalog reader sharing `storefront`'s credential.
    #[must_use]
    pub fn catalog_for(&self, storefront: &Storefront<RestGateway>) -> CatalogClient {
        CatalogClient::new(storefront.gateway().api().clone())
    }

    /// A catalog reader for this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn catalog(&self) -> Result<CatalogClient, HttpError> {
        Ok(CatalogClient::new(ApiClient::new(&self.config())?))
    }

    pub fn set_cart_shape(&self, shape: CartShape) {
        lock(&self.state).cart_shape = shape;
    }

    pub fn set_wishlist_shape(&self, shape: WishlistShape) {
        lock(&self.state).wishlist_shape = shape;
    }

    /// Answer the next request, whatever it is, with `status`.
    pub fn fail_next(&self, status: StatusCode) {
        lock(&self.state).fail_next = Some(status);
    }

    /// Keep cart mutations in flight for `delay` before applying them.
    pub fn set_mutation_delay(&self, delay: Duration) {
        lock(&self.state).mutation_delay = Some(delay);
    }

    /// Whether registration signs the new account in with a token.
    pub fn set_register_issues_token(&self, issue: bool) {
        lock(&self.state).register_issues_token = issue;
    }

    /// Invalidate every issued token.
    pub fn revoke_sessions(&self) {
        lock(&self.state).sessions.clear();
    }

    /// Put lines into a user's server-side cart directly.
    pub fn seed_cart(&self, user_id: &str, lines: &[(&str, u32)]) {
        let mut state = lock(&self.state);
        let cart = state.carts.entry(user_id.to_string()).or_default();
        for (product_id, qty) in lines {
            set_line(cart, product_id, *qty);
        }
    }

    /// A user's server-side cart.
    #[must_use]
    pub fn server_cart(&self, user_id: &str) -> Vec<(String, u32)> {
        lock(&self.state)
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request received, as `"METHOD /route"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// How many times `route` was requested.
    #[must_use]
    pub fn request_count(&self, route: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| *r == route)
            .count()
    }

    /// Highest number of cart mutations observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        lock(&self.state).max_in_flight
    }

    /// Bodies received by the checkout session endpoint.
    #[must_use]
    pub fn checkout_requests(&self) -> Vec<Value> {
        lock(&self.state).checkout_requests.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[must_use]
pub fn buyer_credentials() -> LoginCredentials {
    LoginCredentials {
        email: BUYER_EMAIL.to_string(),
        password: SecretString::from(BUYER_PASSWORD),
        role: UserRole::Buyer,
    }
}

/// A configuration whose API base URL refuses connections.
///
/// # Errors
///
/// Returns an error if no local port can be bound.
pub async fn unreachable_config(template: &ClientConfig) -> std::io::Result<ClientConfig> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let mut config = template.clone();
    config.api_base_url = Url::parse(&format!("http://{addr}/api/v1/"))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    Ok(config)
}
