fn main() -> anyhow::Result<()> {
    orbitfolio::run()
}
