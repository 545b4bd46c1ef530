//! Plain-text rendering of command results.
//!
//! Renderers build a `String` so they can be tested; [`print`] and
//! [`failure`] are the only places that touch stdout and stderr.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use indian_flavour_core::{Cart, CurrencyCode, Price, Product, Profile};
use indian_flavour_storefront::models::{AdminOrder, CurrentUser, OrderWithItems};
use indian_flavour_storefront::services::{DashboardStats, order_eta};

/// Write command output to stdout.
#[allow(clippy::print_stdout)]
pub fn print(text: &str) {
    println!("{text}");
}

/// Write an error message to stderr.
#[allow(clippy::print_stderr)]
pub fn failure(message: &str) {
    eprintln!("error: {message}");
}

fn price(amount: rust_decimal::Decimal, currency: CurrencyCode) -> Price {
    Price::new(amount, currency)
}

fn date(at: DateTime<Utc>) -> String {
    at.format("%d %b %Y").to_string()
}

pub fn user(user: &CurrentUser) -> String {
    let mut out = format!("Signed in as {}", user.display_name());
    if let Some(email) = &user.email
        && user.full_name.is_some()
    {
        let _ = write!(out, " <{email}>");
    }
    if user.is_admin() {
        out.push_str(" (admin)");
    }
    out
}

pub fn profile(profile: &Profile, email: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:   {}", profile.full_name.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Email:  {}", email.unwrap_or("-"));
    let _ = writeln!(out, "Role:   {}", profile.role);
    let _ = write!(out, "Joined: {}", date(profile.created_at));
    out
}

pub fn products(products: &[Product], currency: CurrencyCode) -> String {
    if products.is_empty() {
        return "No products available".to_owned();
    }
    let mut out = String::new();
    for product in products {
        let _ = writeln!(
            out,
            "{}  {}  {}",
            product.id,
            product.name,
            price(product.price, currency)
        );
        if let Some(description) = &product.description {
            let _ = writeln!(out, "    {description}");
        }
    }
    out.trim_end().to_owned()
}

pub fn cart(cart: &Cart, currency: CurrencyCode) -> String {
    if cart.is_empty() {
        return "Your cart is empty".to_owned();
    }
    let mut out = String::new();
    for line in cart.lines() {
        let _ = writeln!(
            out,
            "{}  {} x{} @ {}  {}",
            line.product_id,
            line.name,
            line.quantity,
            price(line.price, currency),
            price(line.line_total(), currency)
        );
    }
    let _ = write!(
        out,
        "{} items, total {}",
        cart.item_count(),
        price(cart.total(), currency)
    );
    out
}

pub fn orders(orders: &[OrderWithItems], now: DateTime<Utc>, currency: CurrencyCode) -> String {
    if orders.is_empty() {
        return "You have no orders yet".to_owned();
    }
    let mut out = String::new();
    for OrderWithItems { order, items } in orders {
        let _ = writeln!(
            out,
            "Order #{}  {}  {}  {}",
            order.id.short(),
            date(order.created_at),
            order.status.label(),
            price(order.total_amount, currency)
        );
        if let Some(eta) = order_eta(order, now) {
            let _ = writeln!(out, "  Estimated delivery: {eta}");
        }
        if let Some(address) = &order.delivery_address {
            let _ = writeln!(out, "  Deliver to: {address}");
        }
        for item in items {
            let _ = writeln!(
                out,
                "  {} x{}  {}",
                item.product_name(),
                item.item.quantity,
                price(item.item.line_total(), currency)
            );
        }
        out.push('\n');
    }
    out.trim_end().to_owned()
}

pub fn dashboard(stats: &DashboardStats, currency: CurrencyCode) -> String {
    format!(
        "Total orders:   {}\nPending orders: {}\nRevenue:        {}\nCustomers:      {}\nProducts:       {}",
        stats.total_orders,
        stats.pending_orders,
        price(stats.revenue, currency),
        stats.customers,
        stats.products
    )
}

pub fn admin_orders(orders: &[AdminOrder], currency: CurrencyCode) -> String {
    if orders.is_empty() {
        return "No orders".to_owned();
    }
    let mut out = String::new();
    for order in orders {
        let _ = writeln!(
            out,
            "{}  {}  {}  {}  {}",
            order.id,
            date(order.created_at),
            order.customer_name(),
            order.status,
            price(order.total_amount, currency)
        );
        if let Some(delivery) = order.delivery_status {
            let _ = writeln!(out, "  Delivery: {delivery}");
        }
        if let Some(contact) = &order.delivery_contact {
            let _ = writeln!(out, "  Contact: {contact}");
        }
        for item in &order.order_items {
            let _ = writeln!(
                out,
                "  {} x{}  {}",
                item.product_name(),
                item.quantity,
                price(item.line_total(), currency)
            );
        }
    }
    out.trim_end().to_owned()
}
