fn main() -> anyhow::Result<()> {
    taskdock::run()?;
    Ok(())
}
