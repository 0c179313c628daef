fn main() {
    macrojs::cli::run();
}
