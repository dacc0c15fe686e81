fn main() -> anyhow::Result<()> {
    carspec_lib::run()
}
