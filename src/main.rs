use courier_rs::notifications::NoNotificationTypes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_rs::cli::run(&NoNotificationTypes).await
}
