use anyhow::Result;

fn main() -> Result<()> {
    blazegraph_cli::run()
}
