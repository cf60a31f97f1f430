fn main() -> anyhow::Result<()> {
    songbot::cli::main()
}
