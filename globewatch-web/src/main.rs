use macroquad::prelude::Conf;

fn window_conf() -> Conf {
    Conf {
        window_title: "Globewatch".to_owned(),
        window_width: 1280,
        window_height: 800,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    globewatch_web_lib::run().await;
}
