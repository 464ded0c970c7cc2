#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    alkabeta::init_tracing();
    alkabeta::server::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
