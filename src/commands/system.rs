use colored::Colorize;

pub fn print_help() {
    println!("\n{}", "📄 Document Question-Answering".bold());
    println!("  Upload a PDF, fill in the settings, then ask questions about it.");
    println!();

    println!("⚙️ Settings:");
    println!("  set llm-key <key>        - Groq API key");
    println!("  set embedding-key <key>  - Cohere API key");
    println!("  set vector-key <key>     - Pinecone API key");
    println!("  set index <name>         - Pinecone index name");
    println!();

    println!("📁 Document:");
    println!("  upload <path>   - Choose the source PDF");
    println!();

    println!("💬 Questions:");
    println!("  ask <query>     - Ask about the uploaded document");
    println!("  <query>         - Anything else is asked as a question");
    println!();

    println!("🔧 System:");
    println!("  status  - Show settings and cache state");
    println!("  help    - Show this help menu");
    println!("  exit    - Exit the program");
    println!();
}

pub fn print_goodbye() {
    println!("👋 Goodbye!");
}
