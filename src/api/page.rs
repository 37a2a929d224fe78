use actix_web::{HttpResponse, Responder};

/// Minimal destination-choice page; real deployments put their own landing
/// page in front and only call POST /track.
const CHOOSE_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Choose a channel</title>
</head>
<body>
  <h1>Talk to us</h1>
  <ul>
    <li><a href="#" data-dest="chat-platform">Chat with us</a></li>
    <li><a href="#" data-dest="messaging-app">Add us on messenger</a></li>
    <li><a href="#" data-dest="marketplace">Visit our store</a></li>
  </ul>
  <script>
    document.querySelectorAll("[data-dest]").forEach(function (el) {
      el.addEventListener("click", function (ev) {
        ev.preventDefault();
        fetch("/track", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({
            dest: el.dataset.dest,
            query: Object.fromEntries(new URLSearchParams(location.search)),
          }),
        })
          .then(function (r) { return r.json(); })
          .then(function (data) {
            if (data.ok) { location.href = data.redirect_to; }
          });
      });
    });
  </script>
</body>
</html>
"##;

pub struct PageService {}

impl PageService {
    pub async fn choose() -> impl Responder {
        HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(CHOOSE_PAGE)
    }
}
