use http::StatusCode;
use wisp_web::router::{get, post, Router};
use wisp_web::{handler_fn, MemorySessionStore, Server};

fn main() {
    let router = Router::builder()
        .route(
            "/",
            get(handler_fn(|_, response, _| {
                response.html("<html><body><h1>hello world</h1></body></html>");
                Ok(())
            })),
        )
        .route(
            "/hello/{name}",
            get(handler_fn(|req, response, _| {
                let name = req.path_params().get("name").unwrap_or("world");
                response.text(format!("hello {name}\r\n"));
                Ok(())
            })),
        )
        .route(
            "/visits",
            get(handler_fn(|_, response, session| {
                let Some(session) = session else {
                    response.set_status(StatusCode::SERVICE_UNAVAILABLE);
                    return Ok(());
                };
                let visits = session.get("visits").and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
                session.insert("visits", visits.to_string());
                response.text(format!("visit #{visits}\r\n"));
                Ok(())
            })),
        )
        .route(
            "/login",
            post(handler_fn(|req, response, session| {
                let Some(user) = req.request().form_param("user") else {
                    response.set_status(StatusCode::BAD_REQUEST);
                    response.text("missing user\r\n");
                    return Ok(());
                };
                if let Some(session) = session {
                    session.insert("user", user);
                }
                response.redirect("/visits")?;
                Ok(())
            })),
        )
        .build()
        .expect("routes should be valid");

    let server = Server::builder()
        .address("127.0.0.1:3000")
        .handler(router)
        .session_hook(MemorySessionStore::new())
        .build()
        .expect("server should bind");

    if let Err(e) = server.run() {
        eprintln!("server stopped with error: {e}");
    }
}
