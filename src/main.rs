fn main() -> anyhow::Result<()> {
    chat_history_export::cli::run()
}
